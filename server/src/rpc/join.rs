//! Startup join handshake (C6 step 1-4)
//!
//! A joining replica knows one bootstrap address. It registers itself
//! there, learns the current leader, opens a handle to it, and pulls the
//! leader's peer table to populate its own. The heartbeat task (step 5)
//! is started by the caller once this returns.

use std::net::Ipv4Addr;

use chat_proto::{GetServersRequest, NewReplicaRequest};

use crate::domain::membership::{self, PeerInfo};
use crate::domain::{DomainError, Membership};

pub async fn join_cluster(
    membership: &Membership,
    bootstrap_ip: Ipv4Addr,
    bootstrap_port: u16,
) -> Result<(), DomainError> {
    let self_info = membership.self_info().clone();

    let mut bootstrap_client = membership::connect(bootstrap_ip, bootstrap_port);
    let leader = bootstrap_client
        .new_replica(NewReplicaRequest {
            new_replica_id: self_info.id.clone(),
            ip: self_info.ip.to_string(),
            port: self_info.port as i32,
        })
        .await
        .map_err(DomainError::from)?
        .into_inner();

    let leader_ip: Ipv4Addr = leader
        .ip
        .parse()
        .map_err(|_| DomainError::PeerUnreachable("leader returned an invalid address".to_string()))?;
    let leader_port = leader.port as u16;

    let leader_client = if leader.id == self_info.id {
        // We bootstrapped directly through the server that turns out to be
        // ourselves; nothing to connect to.
        bootstrap_client.clone()
    } else if leader_ip == bootstrap_ip && leader_port == bootstrap_port {
        bootstrap_client.clone()
    } else {
        membership::connect(leader_ip, leader_port)
    };

    membership.upsert_peer(
        PeerInfo {
            id: leader.id.clone(),
            ip: leader_ip,
            port: leader_port,
        },
        leader_client.clone(),
    );

    let mut leader_client = leader_client;
    let mut servers = leader_client
        .get_servers(GetServersRequest {
            requestor_id: self_info.id.clone(),
        })
        .await
        .map_err(DomainError::from)?
        .into_inner();

    while let Some(server) = servers.message().await.map_err(DomainError::from)? {
        if server.id == self_info.id {
            continue;
        }
        let ip: Ipv4Addr = match server.ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                tracing::warn!(peer = %server.id, "skipping peer with invalid address");
                continue;
            }
        };
        let port = server.port as u16;
        let client = membership::connect(ip, port);
        membership.upsert_peer(
            PeerInfo {
                id: server.id,
                ip,
                port,
            },
            client,
        );
    }

    tracing::info!(leader = %leader.id, "joined cluster");
    Ok(())
}
