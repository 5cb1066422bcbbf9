//! # Wavelink CLI
//!
//! Terminal chat client for a Wavelink server.
//!
//! ## Usage
//!
//! ```bash
//! # Connect with defaults (http://127.0.0.1:4000)
//! wavelink
//!
//! # Custom server and credential
//! WAVELINK_URL=https://app.example.com WAVELINK_TOKEN=... wavelink
//! ```
//!
//! ## Commands
//!
//! - `/join <match-id>` - join a room, leaving the previous one
//! - `/leave` - leave the current room
//! - `/history` - print the current room's log
//! - `/inbox` - fetch and print notifications
//! - `/read <id>` - mark a notification read
//! - `/dismiss <id>` - delete one notification
//! - `/clear` - delete every notification
//! - `/status` - print the connection status
//! - `/quit` - exit
//! - anything else is sent as a chat message to the current room

mod config;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wavelink_core::{
    ChatMessage, ConnectionStatus, HttpHistory, Notification, RealtimeClient, Update,
};
use wavelink_transport::FallbackTransport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wavelink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load()?;

    tracing::info!(server = %config.server_url, "Starting Wavelink client");

    let mut history = HttpHistory::new(config.history_url());
    if let Some(token) = &config.token {
        history = history.with_bearer(token.clone());
    }

    let client = RealtimeClient::new(
        config.client_config(),
        Arc::new(FallbackTransport::default()),
        Arc::new(history),
    );

    client.connect(config.token.as_deref());

    run(&client).await?;

    client.shutdown();
    Ok(())
}

async fn run(client: &RealtimeClient) -> Result<()> {
    let mut updates = client.subscribe();
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    println!("wavelink ready. /join <match-id> to enter a room, /quit to exit.");

    loop {
        tokio::select! {
            maybe_update = updates.recv() => match maybe_update {
                Some(update) => print_update(client, &update),
                None => break,
            },
            maybe_line = lines.next_line() => {
                let Some(line) = maybe_line? else { break };
                if !handle_line(client, line.trim()).await {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Execute one input line. Returns `false` to exit.
async fn handle_line(client: &RealtimeClient, line: &str) -> bool {
    if line.is_empty() {
        return true;
    }

    if !line.starts_with('/') {
        match client.current_match() {
            Some(room) => client.send_message(&room, line),
            None => println!("join a room first: /join <match-id>"),
        }
        return true;
    }

    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/join" if !rest.is_empty() => {
            client.join_match(rest);
            for message in client.load_history(rest).await {
                print_message(&message);
            }
        }
        "/leave" => match client.current_match() {
            Some(room) => client.leave_match(&room),
            None => println!("no joined room"),
        },
        "/history" => match client.current_match() {
            Some(room) => {
                for message in client.messages(&room) {
                    print_message(&message);
                }
            }
            None => println!("no joined room"),
        },
        "/inbox" => {
            for notification in client.inbox().fetch_all().await {
                print_notification(&notification);
            }
            println!("unread: {}", client.inbox().unread());
        }
        "/read" if !rest.is_empty() => {
            if let Err(e) = client.inbox().mark_read(rest).await {
                eprintln!("mark-read failed, try again: {e}");
            }
        }
        "/dismiss" if !rest.is_empty() => {
            if let Err(e) = client.inbox().remove(rest).await {
                eprintln!("dismiss failed, try again: {e}");
            }
        }
        "/clear" => {
            if let Err(e) = client.inbox().clear_all().await {
                eprintln!("clear failed, try again: {e}");
            }
        }
        "/status" => println!("{:?}", client.status()),
        "/quit" | "/exit" => return false,
        other => println!("unknown command: {other}"),
    }

    true
}

fn print_update(client: &RealtimeClient, update: &Update) {
    match update {
        Update::ConnectionChanged(status) => match status {
            ConnectionStatus::Connected => println!("* connected"),
            ConnectionStatus::Connecting => println!("* connecting..."),
            ConnectionStatus::Disconnected => println!("* disconnected"),
        },
        Update::MessageAppended { message, .. } => print_message(message),
        Update::InboxChanged => {
            println!("* inbox: {} unread", client.inbox().unread());
        }
        Update::MatchChanged(_) => println!("* match updated"),
        Update::ApplicationChanged(_) => println!("* application updated"),
    }
}

fn print_message(message: &ChatMessage) {
    println!(
        "[{}] {}: {}",
        message.created_at.format("%H:%M:%S"),
        message.sender_id,
        message.text
    );
}

fn print_notification(notification: &Notification) {
    let marker = if notification.status.is_unread() {
        "*"
    } else {
        " "
    };
    println!(
        "{} [{}] {} ({})",
        marker, notification.kind, notification.content, notification.id
    );
}
