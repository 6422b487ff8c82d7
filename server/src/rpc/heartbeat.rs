//! Background heartbeat sweep (C6) and the election it triggers (C7)
//!
//! One ticker drives both the outbound heartbeat round and the failure
//! sweep, per the design note preferring a single ticker over
//! self-rescheduling timers so shutdown has one task to join.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use chat_proto::HeartbeatRequest;

use crate::core::constants::{FAILURE_TIMEOUT_SECS, HEARTBEAT_INTERVAL_SECS, RPC_PROBE_TIMEOUT_SECS};
use crate::domain::Membership;

pub fn spawn(membership: Arc<Membership>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!("heartbeat task shutting down");
                        break;
                    }
                }
                _ = interval.tick() => {
                    run_round(&membership).await;
                }
            }
        }
    })
}

async fn run_round(membership: &Membership) {
    send_heartbeats(membership).await;

    let failed = membership.sweep_failures(Duration::from_secs(FAILURE_TIMEOUT_SECS));
    if failed.is_empty() {
        return;
    }

    let lost_leader_id = membership.leader_id();
    let lost_leader = failed.iter().any(|p| p.id == lost_leader_id);
    for peer in &failed {
        tracing::warn!(peer = %peer.id, "peer failure detected, removed from peer table");
    }

    if lost_leader {
        membership.elect();
    }
}

async fn send_heartbeats(membership: &Membership) {
    let self_id = membership.self_info().id.clone();
    let timeout = Duration::from_secs(RPC_PROBE_TIMEOUT_SECS);

    for (id, mut client) in membership.peer_clients() {
        let request = HeartbeatRequest {
            requestor_id: self_id.clone(),
            server_id: id.clone(),
        };
        match tokio::time::timeout(timeout, client.heartbeat(request)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!(peer = %id, error = %e, "heartbeat rpc error"),
            Err(_) => tracing::debug!(peer = %id, "heartbeat timed out"),
        }
    }
}
