//! Dispatch for the headless CLI surface: one function per RPC, plus the
//! auto-restarting monitor loop.

use std::time::Duration;

use chat_proto::{
    DeleteAccountRequest, GetServersRequest, GetSettingsRequest, GetUsersRequest, LoginRequest,
    Message, MessageHistoryRequest, MonitorMessagesRequest, PendingMessageRequest, RegisterRequest,
    RequestSource, SaveSettingsRequest, Status as ChatStatus,
};
use tokio_stream::StreamExt;

use crate::connector::Connector;
use crate::core::cli::Commands;
use crate::core::constants::CLIENT_MONITOR_RESTART_DELAY_SECS;

pub async fn dispatch(connector: &Connector, command: Commands) {
    match command {
        Commands::Register { username, password, email } => register(connector, username, password, email).await,
        Commands::Login { username, password } => login(connector, username, password).await,
        Commands::Users => users(connector).await,
        Commands::GetSettings { username } => get_settings(connector, username).await,
        Commands::SaveSettings { username, setting } => save_settings(connector, username, setting).await,
        Commands::DeleteAccount { username } => delete_account(connector, username).await,
        Commands::Send { sender, recipient, body } => send(connector, sender, recipient, body).await,
        Commands::Pending { username, limit } => pending(connector, username, limit).await,
        Commands::History { username } => history(connector, username).await,
        Commands::Monitor { username } => monitor(connector, username).await,
        Commands::Servers => servers(connector).await,
    }
}

fn is_success(status: i32) -> bool {
    status == ChatStatus::Success as i32
}

async fn register(connector: &Connector, username: String, password: String, email: String) {
    let request = RegisterRequest { username, password, email, source: RequestSource::Client as i32 };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.register(r).await } }).await;
    match result {
        Ok(resp) => println!("{}", resp.into_inner().message),
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}

async fn login(connector: &Connector, username: String, password: String) {
    let request = LoginRequest { username, password, source: RequestSource::Client as i32 };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.login(r).await } }).await;
    match result {
        Ok(resp) => println!("{}", resp.into_inner().message),
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}

async fn users(connector: &Connector) {
    let request = GetUsersRequest { username: "Client".to_string() };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.get_users(r).await } }).await;
    match result {
        Ok(resp) => {
            let mut stream = resp.into_inner();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(user) if is_success(user.status) => println!("{}", user.username),
                    Ok(_) => {}
                    Err(e) => {
                        println!("FAILURE: {}", e.message());
                        break;
                    }
                }
            }
        }
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}

async fn get_settings(connector: &Connector, username: String) {
    let request = GetSettingsRequest { username };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.get_settings(r).await } }).await;
    match result {
        Ok(resp) => {
            let resp = resp.into_inner();
            if is_success(resp.status) {
                println!("inbox limit: {}", resp.setting);
            } else {
                println!("FAILURE: no such user");
            }
        }
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}

async fn save_settings(connector: &Connector, username: String, setting: i32) {
    let request = SaveSettingsRequest { username, setting, source: RequestSource::Client as i32 };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.save_settings(r).await } }).await;
    report(result.map(|r| r.into_inner().status));
}

async fn delete_account(connector: &Connector, username: String) {
    let request = DeleteAccountRequest { username, source: RequestSource::Client as i32 };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.delete_account(r).await } }).await;
    report(result.map(|r| r.into_inner().status));
}

async fn send(connector: &Connector, sender: String, recipient: String, body: String) {
    let message = Message {
        id: 0,
        sender,
        recipient,
        body,
        timestamp: String::new(),
        source: RequestSource::Client as i32,
    };
    let result = connector.call(|mut c| { let m = message.clone(); async move { c.send_message(m).await } }).await;
    report(result.map(|r| r.into_inner().status));
}

async fn pending(connector: &Connector, username: String, limit: i32) {
    let request = PendingMessageRequest { username, limit, source: RequestSource::Client as i32 };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.get_pending_message(r).await } }).await;
    match result {
        Ok(resp) => {
            let mut stream = resp.into_inner();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(envelope) if is_success(envelope.status) => {
                        if let Some(message) = envelope.message {
                            print_message(&message);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        println!("FAILURE: {}", e.message());
                        break;
                    }
                }
            }
        }
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}

async fn history(connector: &Connector, username: String) {
    let request = MessageHistoryRequest { username };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.get_message_history(r).await } }).await;
    match result {
        Ok(resp) => {
            let mut stream = resp.into_inner();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(message) => print_message(&message),
                    Err(e) => {
                        println!("FAILURE: {}", e.message());
                        break;
                    }
                }
            }
        }
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}

async fn servers(connector: &Connector) {
    let request = GetServersRequest { requestor_id: "Client".to_string() };
    let result = connector.call(|mut c| { let r = request.clone(); async move { c.get_servers(r).await } }).await;
    match result {
        Ok(resp) => {
            let mut stream = resp.into_inner();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(server) => println!("{} @ {}:{}", server.id, server.ip, server.port),
                    Err(e) => {
                        println!("FAILURE: {}", e.message());
                        break;
                    }
                }
            }
        }
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}

/// Opens `MonitorMessages` against whatever server the connector finds and
/// keeps it open until interrupted, restarting on error or on handle change
/// per the client connector's failover contract.
async fn monitor(connector: &Connector, username: String) {
    loop {
        let (addr, mut client, mut generation) = connector.handle_with_generation().await;
        tracing::info!(%addr, %username, "opening monitor stream");

        let request = MonitorMessagesRequest { username: username.clone(), source: RequestSource::Client as i32 };
        match client.monitor_messages(request).await {
            Ok(resp) => {
                let mut stream = resp.into_inner();
                loop {
                    tokio::select! {
                        _ = generation.changed() => {
                            tracing::info!("server handle changed, restarting monitor stream");
                            break;
                        }
                        next = stream.next() => match next {
                            Some(Ok(message)) => print_message(&message),
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, "monitor stream error");
                                break;
                            }
                            None => {
                                tracing::info!("monitor stream closed by server");
                                break;
                            }
                        },
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to open monitor stream"),
        }

        tokio::time::sleep(Duration::from_secs(CLIENT_MONITOR_RESTART_DELAY_SECS)).await;
    }
}

fn print_message(message: &Message) {
    println!("[{}] {} -> {}: {}", message.timestamp, message.sender, message.recipient, message.body);
}

fn report(result: Result<i32, tonic::Status>) {
    match result {
        Ok(status) if is_success(status) => println!("SUCCESS"),
        Ok(_) => println!("FAILURE"),
        Err(e) => println!("FAILURE: {}", e.message()),
    }
}
