//! Server discovery and failover (C8)
//!
//! The connector holds at most one active handle to a server. Every
//! client-originated RPC goes through `call`, which probes (or
//! rediscovers) before dialing and retries once against a freshly
//! discovered handle if the call itself fails. A `watch` channel carries
//! the current handle's generation so a long-lived stream can notice a
//! handle change without polling.

use std::future::Future;
use std::time::Duration;

use chat_proto::HeartbeatRequest;
use chat_proto::chat_client::ChatClient;
use tokio::sync::{Mutex, watch};
use tonic::Status;
use tonic::transport::{Channel, Endpoint};

use crate::core::ServerAddr;
use crate::core::constants::{CLIENT_DISCOVERY_BACKOFF_SECS, CLIENT_PROBE_TIMEOUT_SECS};

fn dial(addr: ServerAddr) -> ChatClient<Channel> {
    let url = format!("http://{}:{}", addr.ip, addr.port);
    let endpoint = Endpoint::from_shared(url).expect("server address is a valid URL");
    ChatClient::new(endpoint.connect_lazy())
}

async fn probe(client: &mut ChatClient<Channel>) -> bool {
    let request = HeartbeatRequest {
        requestor_id: "Client".to_string(),
        server_id: String::new(),
    };
    let timeout = Duration::from_secs(CLIENT_PROBE_TIMEOUT_SECS);
    matches!(tokio::time::timeout(timeout, client.heartbeat(request)).await, Ok(Ok(_)))
}

struct Handle {
    addr: ServerAddr,
    client: ChatClient<Channel>,
}

pub struct Connector {
    servers: Vec<ServerAddr>,
    handle: Mutex<Option<Handle>>,
    generation: watch::Sender<u64>,
}


impl Connector {
    pub fn new(servers: Vec<ServerAddr>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            servers,
            handle: Mutex::new(None),
            generation,
        }
    }

    /// A receiver that fires once the handle currently in use is replaced.
    pub fn watch_generation(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    async fn invalidate(&self) {
        *self.handle.lock().await = None;
    }

    /// Reuse the live handle if it still answers, otherwise sweep the
    /// configured server list until one does. Blocks (with backoff) until a
    /// server is reachable; there is no such thing as "no server available"
    /// from the caller's point of view, only "not yet".
    async fn handle(&self) -> (ServerAddr, ChatClient<Channel>) {
        loop {
            {
                let mut guard = self.handle.lock().await;
                if let Some(h) = guard.as_mut() {
                    if probe(&mut h.client).await {
                        return (h.addr, h.client.clone());
                    }
                    tracing::debug!(addr = %h.addr, "handle failed probe, rediscovering");
                    *guard = None;
                }
            }

            for &addr in &self.servers {
                let mut client = dial(addr);
                if probe(&mut client).await {
                    tracing::info!(%addr, "connected to server");
                    *self.handle.lock().await = Some(Handle { addr, client: client.clone() });
                    self.generation.send_modify(|g| *g += 1);
                    return (addr, client);
                }
            }

            tracing::warn!("no configured server responded, retrying discovery");
            tokio::time::sleep(Duration::from_secs(CLIENT_DISCOVERY_BACKOFF_SECS)).await;
        }
    }

    /// Discover a handle and hand back both it and a generation receiver
    /// baselined to it, so a caller can detect a later handle change.
    pub async fn handle_with_generation(&self) -> (ServerAddr, ChatClient<Channel>, watch::Receiver<u64>) {
        let (addr, client) = self.handle().await;
        (addr, client, self.watch_generation())
    }

    /// Run a unary RPC against the current handle. On failure, invalidate
    /// the handle and retry once against a freshly discovered one.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, Status>
    where
        F: Fn(ChatClient<Channel>) -> Fut,
        Fut: Future<Output = Result<T, Status>>,
    {
        let (_, client) = self.handle().await;
        match op(client).await {
            Ok(value) => Ok(value),
            Err(status) => {
                tracing::warn!(error = %status, "rpc failed, rediscovering and retrying once");
                self.invalidate().await;
                let (_, client) = self.handle().await;
                op(client).await
            }
        }
    }
}
