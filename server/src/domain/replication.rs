//! Leader-side fan-out engine (C5)
//!
//! Fire-and-forget: once the leader has applied and persisted a
//! client-originated write, it re-dispatches the same operation to every
//! known peer tagged `source=Leader`. A peer that times out or errors is
//! logged and left for the next heartbeat sweep to evict; fan-out never
//! rolls back the leader's own state.

use std::future::Future;
use std::time::Duration;

use tonic::transport::Channel;

use chat_proto::chat_client::ChatClient;

use crate::core::constants::HEARTBEAT_INTERVAL_SECS;
use crate::domain::membership::Membership;

/// Re-dispatch `op` to every peer in `membership` concurrently, each
/// bounded by the heartbeat interval. Waits for all peers to finish (or
/// time out) before returning so callers can log a settled result, but no
/// individual failure is propagated to the caller.
pub async fn fan_out<F, Fut>(membership: &Membership, op: F)
where
    F: Fn(ChatClient<Channel>) -> Fut,
    Fut: Future<Output = Result<(), tonic::Status>>,
{
    let timeout = Duration::from_secs(HEARTBEAT_INTERVAL_SECS);
    let peers = membership.peer_clients();

    let attempts = peers.into_iter().map(|(id, client)| {
        let op_fut = op(client);
        async move { (id, tokio::time::timeout(timeout, op_fut).await) }
    });

    for (id, result) in futures::future::join_all(attempts).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(status)) => {
                tracing::warn!(peer = %id, error = %status, "fan-out RPC failed");
            }
            Err(_) => {
                tracing::warn!(peer = %id, "fan-out RPC timed out");
            }
        }
    }
}
