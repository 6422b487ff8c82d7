//! gRPC server startup

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tonic::transport::Server as TonicServer;

use chat_proto::chat_server::ChatServer;

use super::service::ChatService;
use crate::data::sqlite::SqliteService;
use crate::domain::{DeliveryHub, Membership};

pub struct RpcServer {
    addr: SocketAddr,
    service: ChatService,
}

impl RpcServer {
    pub fn new(
        ip: std::net::Ipv4Addr,
        port: u16,
        db: Arc<SqliteService>,
        membership: Arc<Membership>,
        hub: Arc<DeliveryHub>,
    ) -> Self {
        Self {
            addr: SocketAddr::new(ip.into(), port),
            service: ChatService { db, membership, hub },
        }
    }

    pub async fn start(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let addr = self.addr;
        tracing::debug!(%addr, "starting chat RPC server");

        TonicServer::builder()
            .add_service(ChatServer::new(self.service))
            .serve_with_shutdown(addr, async move {
                let _ = shutdown_rx.wait_for(|&v| v).await;
                tracing::debug!("chat RPC server shutting down");
            })
            .await?;

        Ok(())
    }
}
