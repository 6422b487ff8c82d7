//! Time utility functions

use chrono::Utc;

/// Current instant as an RFC 3339 / ISO-8601 string, the wire format for message timestamps.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn now_iso8601_parses_back() {
        let ts = now_iso8601();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
