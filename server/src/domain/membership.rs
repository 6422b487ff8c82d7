//! Peer table, leader reference, and minimum-identifier election (C6, C7)
//!
//! The design notes call out that the leader reference and the peer table
//! share a lifecycle and should swap atomically together. Here the leader
//! is not a separate handle at all: it is just an id that names an entry
//! already present in the peer table (or self). Election only ever
//! reassigns that id; the table itself is untouched by it.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use chat_proto::chat_client::ChatClient;
use dashmap::DashMap;
use parking_lot::RwLock;
use tonic::transport::{Channel, Endpoint};

/// Network identity of a peer, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: String,
    pub ip: Ipv4Addr,
    pub port: u16,
}

struct PeerEntry {
    info: PeerInfo,
    client: ChatClient<Channel>,
    last_heartbeat: Instant,
}

/// Open a lazily-connecting channel to a peer. `connect_lazy` defers the
/// TCP handshake to first use, so adding a peer never blocks on it being
/// reachable yet.
pub fn connect(ip: Ipv4Addr, port: u16) -> ChatClient<Channel> {
    let url = format!("http://{}:{}", ip, port);
    let endpoint = Endpoint::from_shared(url).expect("peer address is a valid URL");
    ChatClient::new(endpoint.connect_lazy())
}

pub struct Membership {
    self_info: PeerInfo,
    /// Every other known cluster member, whether leader or replica.
    peers: DashMap<String, PeerEntry>,
    leader_id: RwLock<String>,
}

impl Membership {
    /// A freshly started process is, until told otherwise, the leader of its
    /// own single-member cluster.
    pub fn new(self_info: PeerInfo) -> Self {
        let leader_id = RwLock::new(self_info.id.clone());
        Self {
            self_info,
            peers: DashMap::new(),
            leader_id,
        }
    }

    pub fn self_info(&self) -> &PeerInfo {
        &self.self_info
    }

    pub fn leader_id(&self) -> String {
        self.leader_id.read().clone()
    }

    pub fn is_leader(&self) -> bool {
        *self.leader_id.read() == self.self_info.id
    }

    /// The leader's identity, if known. `None` only in the brief window
    /// between a leader's removal from the table and the next election.
    pub fn leader_info(&self) -> Option<PeerInfo> {
        let id = self.leader_id();
        if id == self.self_info.id {
            Some(self.self_info.clone())
        } else {
            self.peers.get(&id).map(|e| e.info.clone())
        }
    }

    /// A handle to the leader, or `None` if this process is the leader.
    pub fn leader_client(&self) -> Option<ChatClient<Channel>> {
        let id = self.leader_id();
        if id == self.self_info.id {
            None
        } else {
            self.peers.get(&id).map(|e| e.client.clone())
        }
    }

    fn set_leader(&self, id: &str) {
        *self.leader_id.write() = id.to_string();
    }

    /// Force this process to believe itself the leader, used only for the
    /// very first process in a new cluster.
    pub fn set_leader_self(&self) {
        let id = self.self_info.id.clone();
        self.set_leader(&id);
    }

    /// Add or refresh a peer's entry (join handshake, or a heartbeat from a
    /// peer this server has a client for but hadn't recorded yet).
    pub fn upsert_peer(&self, info: PeerInfo, client: ChatClient<Channel>) {
        self.peers.insert(
            info.id.clone(),
            PeerEntry {
                info,
                client,
                last_heartbeat: Instant::now(),
            },
        );
    }

    /// Refresh a known peer's last-heartbeat time. Unknown ids are ignored:
    /// a server only enters the table via the join handshake.
    pub fn touch(&self, id: &str) {
        if let Some(mut entry) = self.peers.get_mut(id) {
            entry.last_heartbeat = Instant::now();
        }
    }

    pub fn peer_ids(&self) -> Vec<String> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    pub fn peer_infos(&self) -> Vec<PeerInfo> {
        self.peers.iter().map(|e| e.info.clone()).collect()
    }

    /// Handles for fan-out: one client per live peer. When this process is
    /// the leader, these are exactly its replicas.
    pub fn peer_clients(&self) -> Vec<(String, ChatClient<Channel>)> {
        self.peers
            .iter()
            .map(|e| (e.info.id.clone(), e.client.clone()))
            .collect()
    }

    /// Remove peers that have not heartbeated within `timeout`. Returns the
    /// removed peers so the caller can decide whether an election is due.
    pub fn sweep_failures(&self, timeout: Duration) -> Vec<PeerInfo> {
        let now = Instant::now();
        let stale: Vec<String> = self
            .peers
            .iter()
            .filter(|e| now.duration_since(e.last_heartbeat) > timeout)
            .map(|e| e.key().clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|id| self.peers.remove(&id).map(|(_, entry)| entry.info))
            .collect()
    }

    /// Deterministic minimum-identifier election over surviving peers ∪ self.
    /// Returns the elected peer's info.
    pub fn elect(&self) -> PeerInfo {
        let mut winner = self.self_info.clone();

        for entry in self.peers.iter() {
            if entry.info.id < winner.id {
                winner = entry.info.clone();
            }
        }

        self.set_leader(&winner.id);
        tracing::info!(leader = %winner.id, "leader election completed");
        winner
    }
}
