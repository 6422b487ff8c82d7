//! Wire-protocol surface
//!
//! - `service` - the `Chat` RPC handlers (C4), routing writes to the leader
//! - `heartbeat` - the background liveness sweep and election trigger (C6, C7)
//! - `server` - binds the listener and serves `ChatService`

mod heartbeat;
mod join;
mod server;
mod service;

pub use heartbeat::spawn as spawn_heartbeat;
pub use join::join_cluster;
pub use server::RpcServer;
pub use service::ChatService;
