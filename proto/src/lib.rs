//! Generated wire types and the `Chat` service definition.

tonic::include_proto!("chat");

impl RequestSource {
    pub fn is_leader(self) -> bool {
        matches!(self, RequestSource::Leader)
    }
}

impl Status {
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }
}
