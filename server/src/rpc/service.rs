//! RPC surface (C4): one handler per operation in the wire protocol.
//!
//! Every write handler follows the same routing rule: a client-sourced
//! request on a non-leader forwards to the leader and returns its answer
//! unchanged; a client-sourced request on the leader applies locally then
//! fans out to every replica tagged `source=Leader`; a leader-sourced
//! request (arriving at a replica) only ever applies locally. Streaming
//! reads are always served from local state, since each server carries its
//! own replicated copy of the store.

use std::net::Ipv4Addr;
use std::pin::Pin;

use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status};

use chat_proto::chat_server::Chat;
use chat_proto::{
    DeleteAccountRequest, DeleteAccountResponse, GetServersRequest, GetSettingsRequest,
    GetSettingsResponse, GetUsersRequest, HeartbeatRequest, HeartbeatResponse, LeaderResponse,
    LoginRequest, LoginResponse, Message, MessageHistoryRequest, MessageResponse,
    MonitorMessagesRequest, NewReplicaRequest, PendingMessageEnvelope, PendingMessageRequest,
    RegisterRequest, RegisterResponse, RequestSource, SaveSettingsRequest, SaveSettingsResponse,
    ServerInfo, Status as ChatStatus, UserInfo,
};

use crate::data::DataError;
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::{message as message_repo, user as user_repo};
use crate::domain::{DeliveryHub, DomainError, Membership, PeerInfo, auth, membership, replication};
use crate::utils::time::now_iso8601;

use std::sync::Arc;

pub struct ChatService {
    pub db: Arc<SqliteService>,
    pub membership: Arc<Membership>,
    pub hub: Arc<DeliveryHub>,
}

type RpcResult<T> = Result<Response<T>, Status>;
type BoxStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

impl ChatService {
    fn success_register(message: &str) -> RegisterResponse {
        RegisterResponse {
            status: ChatStatus::Success as i32,
            message: message.to_string(),
        }
    }

    fn failure_register(message: &str) -> RegisterResponse {
        RegisterResponse {
            status: ChatStatus::Failure as i32,
            message: message.to_string(),
        }
    }

    fn describe(err: &DomainError) -> &'static str {
        match err {
            DomainError::DuplicateKey => "Username already exists",
            DomainError::AuthFailure => "Invalid username or password",
            DomainError::NotFound => "Not found",
            _ => "Internal error",
        }
    }
}

#[tonic::async_trait]
impl Chat for ChatService {
    async fn register(&self, request: Request<RegisterRequest>) -> RpcResult<RegisterResponse> {
        let req = request.into_inner();

        if req.source() == RequestSource::Client && !self.membership.is_leader() {
            let mut leader = self
                .membership
                .leader_client()
                .ok_or_else(|| Status::unavailable("no leader known"))?;
            return leader.register(req).await;
        }

        let result = auth::register(self.db.pool(), &req.username, &req.password, &req.email).await;

        if result.is_ok() && req.source() == RequestSource::Client && self.membership.is_leader() {
            let mut leader_req = req.clone();
            leader_req.set_source(RequestSource::Leader);
            replication::fan_out(&self.membership, |mut client| {
                let r = leader_req.clone();
                async move { client.register(r).await.map(|_| ()) }
            })
            .await;
        }

        let response = match result {
            Ok(()) => Self::success_register("Registered"),
            Err(e) => Self::failure_register(Self::describe(&e)),
        };
        Ok(Response::new(response))
    }

    async fn login(&self, request: Request<LoginRequest>) -> RpcResult<LoginResponse> {
        let req = request.into_inner();

        if req.source() == RequestSource::Client && !self.membership.is_leader() {
            let mut leader = self
                .membership
                .leader_client()
                .ok_or_else(|| Status::unavailable("no leader known"))?;
            return leader.login(req).await;
        }

        let result = auth::authenticate(self.db.pool(), &req.username, &req.password).await;

        if result.is_ok() && req.source() == RequestSource::Client && self.membership.is_leader() {
            let mut leader_req = req.clone();
            leader_req.set_source(RequestSource::Leader);
            replication::fan_out(&self.membership, |mut client| {
                let r = leader_req.clone();
                async move { client.login(r).await.map(|_| ()) }
            })
            .await;
        }

        let response = LoginResponse {
            status: if result.is_ok() {
                ChatStatus::Success as i32
            } else {
                ChatStatus::Failure as i32
            },
            message: match &result {
                Ok(()) => "Logged in".to_string(),
                Err(e) => Self::describe(e).to_string(),
            },
        };
        Ok(Response::new(response))
    }

    type GetUsersStream = BoxStream<UserInfo>;

    async fn get_users(&self, _request: Request<GetUsersRequest>) -> RpcResult<Self::GetUsersStream> {
        let usernames = user_repo::list_usernames(self.db.pool())
            .await
            .map_err(DataError::from)
            .map_err(|e| Status::internal(e.to_string()))?;

        let items = usernames.into_iter().map(|username| {
            Ok(UserInfo {
                status: ChatStatus::Success as i32,
                username,
            })
        });
        let stream = tokio_stream::iter(items);
        Ok(Response::new(Box::pin(stream)))
    }

    async fn get_settings(&self, request: Request<GetSettingsRequest>) -> RpcResult<GetSettingsResponse> {
        let req = request.into_inner();
        let limit = user_repo::get_inbox_limit(self.db.pool(), &req.username)
            .await
            .map_err(DataError::from)
            .map_err(|e| Status::internal(e.to_string()))?;

        let result = limit.ok_or(DomainError::NotFound);
        let response = match result {
            Ok(setting) => GetSettingsResponse {
                status: ChatStatus::Success as i32,
                setting: setting as i32,
            },
            Err(_) => GetSettingsResponse {
                status: ChatStatus::Failure as i32,
                setting: 0,
            },
        };
        Ok(Response::new(response))
    }

    async fn save_settings(&self, request: Request<SaveSettingsRequest>) -> RpcResult<SaveSettingsResponse> {
        let req = request.into_inner();

        if req.source() == RequestSource::Client && !self.membership.is_leader() {
            let mut leader = self
                .membership
                .leader_client()
                .ok_or_else(|| Status::unavailable("no leader known"))?;
            return leader.save_settings(req).await;
        }

        let updated = user_repo::set_inbox_limit(self.db.pool(), &req.username, req.setting as i64)
            .await
            .map_err(DataError::from)
            .map_err(|e| Status::internal(e.to_string()))?;

        if updated && req.source() == RequestSource::Client && self.membership.is_leader() {
            let mut leader_req = req.clone();
            leader_req.set_source(RequestSource::Leader);
            replication::fan_out(&self.membership, |mut client| {
                let r = leader_req.clone();
                async move { client.save_settings(r).await.map(|_| ()) }
            })
            .await;
        }

        Ok(Response::new(SaveSettingsResponse {
            status: if updated {
                ChatStatus::Success as i32
            } else {
                ChatStatus::Failure as i32
            },
        }))
    }

    async fn delete_account(&self, request: Request<DeleteAccountRequest>) -> RpcResult<DeleteAccountResponse> {
        let req = request.into_inner();

        if req.source() == RequestSource::Client && !self.membership.is_leader() {
            let mut leader = self
                .membership
                .leader_client()
                .ok_or_else(|| Status::unavailable("no leader known"))?;
            return leader.delete_account(req).await;
        }

        let deleted = user_repo::delete_user(self.db.pool(), &req.username)
            .await
            .map_err(DataError::from)
            .map_err(|e| Status::internal(e.to_string()))?;

        if deleted && req.source() == RequestSource::Client && self.membership.is_leader() {
            let mut leader_req = req.clone();
            leader_req.set_source(RequestSource::Leader);
            replication::fan_out(&self.membership, |mut client| {
                let r = leader_req.clone();
                async move { client.delete_account(r).await.map(|_| ()) }
            })
            .await;
        }

        Ok(Response::new(DeleteAccountResponse {
            status: if deleted {
                ChatStatus::Success as i32
            } else {
                ChatStatus::Failure as i32
            },
        }))
    }

    async fn send_message(&self, request: Request<Message>) -> RpcResult<MessageResponse> {
        let req = request.into_inner();

        if req.source() == RequestSource::Client && !self.membership.is_leader() {
            let mut leader = self
                .membership
                .leader_client()
                .ok_or_else(|| Status::unavailable("no leader known"))?;
            return leader.send_message(req).await;
        }

        let outcome = self.apply_send_message(&req).await;

        if outcome.is_ok() && req.source() == RequestSource::Client && self.membership.is_leader() {
            let mut leader_msg = req.clone();
            leader_msg.set_source(RequestSource::Leader);
            replication::fan_out(&self.membership, |mut client| {
                let m = leader_msg.clone();
                async move { client.send_message(m).await.map(|_| ()) }
            })
            .await;
        }

        Ok(Response::new(MessageResponse {
            status: if outcome.is_ok() {
                ChatStatus::Success as i32
            } else {
                ChatStatus::Failure as i32
            },
        }))
    }

    type GetPendingMessageStream = BoxStream<PendingMessageEnvelope>;

    async fn get_pending_message(
        &self,
        request: Request<PendingMessageRequest>,
    ) -> RpcResult<Self::GetPendingMessageStream> {
        let req = request.into_inner();

        if req.source() == RequestSource::Client && !self.membership.is_leader() {
            let mut leader = self
                .membership
                .leader_client()
                .ok_or_else(|| Status::unavailable("no leader known"))?;
            let stream = leader.get_pending_message(req).await?.into_inner();
            return Ok(Response::new(Box::pin(stream)));
        }

        let pool = self.db.pool().clone();
        let rows = message_repo::list_pending_for_recipient(&pool, &req.username, req.limit as i64)
            .await
            .map_err(DataError::from)
            .map_err(|e| Status::internal(e.to_string()))?;

        for row in &rows {
            if let Err(e) = message_repo::mark_delivered(&pool, row.id).await {
                tracing::warn!(id = row.id, error = %e, "failed to mark pending message delivered");
            }
        }

        let items = rows.into_iter().map(|row| {
            Ok(PendingMessageEnvelope {
                status: ChatStatus::Success as i32,
                message: Some(Message {
                    id: row.id,
                    sender: row.sender,
                    recipient: row.recipient,
                    body: row.body,
                    timestamp: row.timestamp,
                    source: RequestSource::Client as i32,
                }),
            })
        });
        let stream = tokio_stream::iter(items);
        Ok(Response::new(Box::pin(stream)))
    }

    type GetMessageHistoryStream = BoxStream<Message>;

    async fn get_message_history(
        &self,
        request: Request<MessageHistoryRequest>,
    ) -> RpcResult<Self::GetMessageHistoryStream> {
        let req = request.into_inner();
        let rows = message_repo::list_history_for_user(self.db.pool(), &req.username)
            .await
            .map_err(DataError::from)
            .map_err(|e| Status::internal(e.to_string()))?;

        let items = rows.into_iter().map(|row| {
            Ok(Message {
                id: row.id,
                sender: row.sender,
                recipient: row.recipient,
                body: row.body,
                timestamp: row.timestamp,
                source: RequestSource::Client as i32,
            })
        });
        let stream = tokio_stream::iter(items);
        Ok(Response::new(Box::pin(stream)))
    }

    type MonitorMessagesStream = BoxStream<Message>;

    async fn monitor_messages(
        &self,
        request: Request<MonitorMessagesRequest>,
    ) -> RpcResult<Self::MonitorMessagesStream> {
        let req = request.into_inner();
        let rx = self.hub.attach(&req.username);
        let stream = UnboundedReceiverStream::new(rx).map(Ok);
        Ok(Response::new(Box::pin(stream)))
    }

    async fn heartbeat(&self, request: Request<HeartbeatRequest>) -> RpcResult<HeartbeatResponse> {
        let req = request.into_inner();
        if req.requestor_id != "Client" {
            self.membership.touch(&req.requestor_id);
        }
        Ok(Response::new(HeartbeatResponse {
            responder_id: self.membership.self_info().id.clone(),
            status: ChatStatus::Success as i32,
        }))
    }

    async fn new_replica(&self, request: Request<NewReplicaRequest>) -> RpcResult<LeaderResponse> {
        let req = request.into_inner();
        let ip: Ipv4Addr = req
            .ip
            .parse()
            .map_err(|_| Status::invalid_argument("invalid ip"))?;
        let port = req.port as u16;

        let client = membership::connect(ip, port);
        self.membership.upsert_peer(
            PeerInfo {
                id: req.new_replica_id.clone(),
                ip,
                port,
            },
            client,
        );

        if self.membership.is_leader() {
            let targets: Vec<_> = self
                .membership
                .peer_clients()
                .into_iter()
                .filter(|(id, _)| id != &req.new_replica_id)
                .collect();
            for (id, mut peer_client) in targets {
                if let Err(e) = peer_client.new_replica(req.clone()).await {
                    tracing::warn!(peer = %id, error = %e, "failed to forward join to peer");
                }
            }
        }

        let leader = self
            .membership
            .leader_info()
            .unwrap_or_else(|| self.membership.self_info().clone());
        Ok(Response::new(LeaderResponse {
            id: leader.id,
            ip: leader.ip.to_string(),
            port: leader.port as i32,
        }))
    }

    type GetServersStream = BoxStream<ServerInfo>;

    async fn get_servers(&self, _request: Request<GetServersRequest>) -> RpcResult<Self::GetServersStream> {
        let items = self.membership.peer_infos().into_iter().map(|p| {
            Ok(ServerInfo {
                id: p.id,
                ip: p.ip.to_string(),
                port: p.port as i32,
            })
        });
        let stream = tokio_stream::iter(items);
        Ok(Response::new(Box::pin(stream)))
    }
}

impl ChatService {
    /// Insert durably, then attempt live delivery; flip to delivered only
    /// if an active subscriber actually received it.
    async fn apply_send_message(&self, req: &Message) -> Result<(), DomainError> {
        let pool = self.db.pool();
        let timestamp = if req.timestamp.is_empty() {
            now_iso8601()
        } else {
            req.timestamp.clone()
        };

        let id = message_repo::insert_message(pool, &req.sender, &req.recipient, &req.body, &timestamp, true)
            .await
            .map_err(DataError::from)?;

        let delivered = Message {
            id,
            sender: req.sender.clone(),
            recipient: req.recipient.clone(),
            body: req.body.clone(),
            timestamp,
            source: req.source,
        };

        if self.hub.try_deliver(&req.recipient, delivered) {
            message_repo::mark_delivered(pool, id)
                .await
                .map_err(DataError::from)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::migrations::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::net::Ipv4Addr;
    use tokio_stream::StreamExt;

    async fn fresh_service(self_id: &str) -> ChatService {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let db = Arc::new(SqliteService::from_pool(pool));
        let info = PeerInfo { id: self_id.to_string(), ip: Ipv4Addr::LOCALHOST, port: 5001 };
        ChatService {
            db,
            membership: Arc::new(Membership::new(info)),
            hub: Arc::new(DeliveryHub::new()),
        }
    }

    fn client_request<T>(msg: T) -> Request<T> {
        Request::new(msg)
    }

    #[tokio::test]
    async fn register_then_login_succeeds_on_the_leader() {
        let svc = fresh_service("self").await;

        let reg = RegisterRequest {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            email: "alice@x.com".to_string(),
            source: RequestSource::Client as i32,
        };
        let resp = svc.register(client_request(reg)).await.unwrap().into_inner();
        assert_eq!(resp.status, ChatStatus::Success as i32);

        let login = LoginRequest {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            source: RequestSource::Client as i32,
        };
        let resp = svc.login(client_request(login)).await.unwrap().into_inner();
        assert_eq!(resp.status, ChatStatus::Success as i32);
    }

    #[tokio::test]
    async fn register_on_a_non_leader_with_no_leader_handle_is_unavailable() {
        let svc = fresh_service("self").await;
        svc.membership.upsert_peer(
            PeerInfo { id: "aaa".to_string(), ip: Ipv4Addr::LOCALHOST, port: 5099 },
            membership::connect(Ipv4Addr::LOCALHOST, 5099),
        );
        svc.membership.elect(); // "aaa" < "self" lexicographically, so "aaa" wins
        assert!(!svc.membership.is_leader());
        // drop straight to the window between a leader's removal and the
        // next election, where no client handle exists for its id at all.
        svc.membership.sweep_failures(std::time::Duration::from_secs(0));

        let reg = RegisterRequest {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            email: "alice@x.com".to_string(),
            source: RequestSource::Client as i32,
        };
        let result = svc.register(client_request(reg)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn get_pending_message_on_a_non_leader_forwards_instead_of_answering_locally() {
        let svc = fresh_service("self").await;
        svc.membership.upsert_peer(
            PeerInfo { id: "aaa".to_string(), ip: Ipv4Addr::LOCALHOST, port: 5099 },
            membership::connect(Ipv4Addr::LOCALHOST, 5099),
        );
        svc.membership.elect(); // "aaa" < "self" lexicographically, so "aaa" wins
        assert!(!svc.membership.is_leader());

        let req = PendingMessageRequest { username: "bob".to_string(), limit: 50, source: RequestSource::Client as i32 };
        // "aaa" is not a real server, so the forward itself fails, but the
        // point is that it is attempted at all rather than answered from
        // this replica's own (empty) local state.
        let result = svc.get_pending_message(client_request(req)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn get_pending_message_replicated_from_the_leader_answers_locally() {
        let svc = fresh_service("self").await;
        let req = PendingMessageRequest { username: "bob".to_string(), limit: 50, source: RequestSource::Leader as i32 };
        let result = svc.get_pending_message(client_request(req)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn get_settings_for_unknown_user_is_failure_not_an_error() {
        let svc = fresh_service("self").await;
        let req = GetSettingsRequest { username: "ghost".to_string() };
        let resp = svc.get_settings(client_request(req)).await.unwrap().into_inner();
        assert_eq!(resp.status, ChatStatus::Failure as i32);
    }

    #[tokio::test]
    async fn get_settings_reports_the_default_inbox_limit() {
        let svc = fresh_service("self").await;
        let reg = RegisterRequest {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            email: "alice@x.com".to_string(),
            source: RequestSource::Client as i32,
        };
        svc.register(client_request(reg)).await.unwrap();

        let req = GetSettingsRequest { username: "alice".to_string() };
        let resp = svc.get_settings(client_request(req)).await.unwrap().into_inner();
        assert_eq!(resp.status, ChatStatus::Success as i32);
        assert_eq!(resp.setting, 50);
    }

    #[tokio::test]
    async fn send_message_then_fetch_pending_marks_it_delivered() {
        let svc = fresh_service("self").await;
        for user in ["alice", "bob"] {
            let reg = RegisterRequest {
                username: user.to_string(),
                password: "pw".to_string(),
                email: format!("{user}@x.com"),
                source: RequestSource::Client as i32,
            };
            svc.register(client_request(reg)).await.unwrap();
        }

        let message = Message {
            id: 0,
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            body: "hi".to_string(),
            timestamp: String::new(),
            source: RequestSource::Client as i32,
        };
        let resp = svc.send_message(client_request(message)).await.unwrap().into_inner();
        assert_eq!(resp.status, ChatStatus::Success as i32);

        let req = PendingMessageRequest { username: "bob".to_string(), limit: 50, source: RequestSource::Client as i32 };
        let mut stream = svc.get_pending_message(client_request(req)).await.unwrap().into_inner();
        let envelope = stream.next().await.unwrap().unwrap();
        assert_eq!(envelope.message.unwrap().body, "hi");
        assert!(stream.next().await.is_none());

        // a second fetch finds nothing pending: the first fetch already
        // marked the row delivered.
        let req = PendingMessageRequest { username: "bob".to_string(), limit: 50, source: RequestSource::Client as i32 };
        let mut stream = svc.get_pending_message(client_request(req)).await.unwrap().into_inner();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn monitor_then_send_delivers_live_without_touching_pending() {
        let svc = fresh_service("self").await;
        for user in ["alice", "bob"] {
            let reg = RegisterRequest {
                username: user.to_string(),
                password: "pw".to_string(),
                email: format!("{user}@x.com"),
                source: RequestSource::Client as i32,
            };
            svc.register(client_request(reg)).await.unwrap();
        }

        let monitor_req = MonitorMessagesRequest { username: "bob".to_string(), source: RequestSource::Client as i32 };
        let mut stream = svc
            .monitor_messages(client_request(monitor_req))
            .await
            .unwrap()
            .into_inner();

        let message = Message {
            id: 0,
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            body: "live".to_string(),
            timestamp: String::new(),
            source: RequestSource::Client as i32,
        };
        svc.send_message(client_request(message)).await.unwrap();

        let delivered = stream.next().await.unwrap().unwrap();
        assert_eq!(delivered.body, "live");

        let req = PendingMessageRequest { username: "bob".to_string(), limit: 50, source: RequestSource::Client as i32 };
        let mut pending = svc.get_pending_message(client_request(req)).await.unwrap().into_inner();
        assert!(pending.next().await.is_none());
    }

    #[tokio::test]
    async fn heartbeat_identifies_the_responder_and_ignores_client_probes() {
        let svc = fresh_service("self").await;
        let req = HeartbeatRequest { requestor_id: "Client".to_string(), server_id: String::new() };
        let resp = svc.heartbeat(client_request(req)).await.unwrap().into_inner();
        assert_eq!(resp.responder_id, "self");
        assert_eq!(resp.status, ChatStatus::Success as i32);
        assert!(svc.membership.peer_ids().is_empty());
    }

    #[tokio::test]
    async fn new_replica_adds_the_joiner_and_reports_the_current_leader() {
        let svc = fresh_service("self").await;
        let req = NewReplicaRequest {
            new_replica_id: "replica-1".to_string(),
            ip: "127.0.0.1".to_string(),
            port: 5002,
        };
        let resp = svc.new_replica(client_request(req)).await.unwrap().into_inner();
        assert_eq!(resp.id, "self");
        assert!(svc.membership.peer_ids().contains(&"replica-1".to_string()));
    }
}
