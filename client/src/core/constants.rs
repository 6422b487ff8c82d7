// =============================================================================
// Application Identity
// =============================================================================

pub const APP_NAME: &str = "Chatc";
pub const APP_NAME_LOWER: &str = "chatc";

// =============================================================================
// Environment Variables
// =============================================================================

pub const ENV_LOG: &str = "CHATD_CLIENT_LOG";
pub const ENV_IP: &str = "CHATD_CLIENT_IP";
pub const ENV_PORT: &str = "CHATD_CLIENT_PORT";

/// Comma-separated `ip:port` list, highest-precedence source for the server list.
pub const ENV_SERVERS: &str = "CHATD_CLIENT_SERVERS";

pub const DEFAULT_PORT: u16 = 5001;

// =============================================================================
// Discovery / Failover Timing
// =============================================================================

/// Timeout for a discovery probe against a candidate server.
pub const CLIENT_PROBE_TIMEOUT_SECS: u64 = 2;

/// Sleep between discovery sweeps when no configured server responds.
pub const CLIENT_DISCOVERY_BACKOFF_SECS: u64 = 1;

/// Delay before the monitor stream auto-restarts after an error or handle
/// change, giving a newly elected leader time to finish its own join.
pub const CLIENT_MONITOR_RESTART_DELAY_SECS: u64 = 3;

/// Default page size for a manual pending-message fetch.
pub const DEFAULT_PENDING_LIMIT: i32 = 50;
