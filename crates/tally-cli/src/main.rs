// Tally
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use futures_util::{Sink, SinkExt, StreamExt};
use http::HeaderValue;
use std::marker::Unpin;
use tokio_tungstenite::{
    connect_async, tungstenite::client::IntoClientRequest, tungstenite::protocol::Message,
};
use tracing::{debug, error};
use tracing_log::AsTrace;
use url::Url;

use tally_common::socket::{MessageEvent, SocketMessage};

/// The Tally CLI
#[derive(Debug, Parser)] // requires `derive` feature
#[command(version, about, long_about = None)]
struct Cli {
    /// API authentication token
    #[arg(short, long)]
    auth: String,

    /// IP address and port to connect to
    #[arg(short, long)]
    connect: String,

    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// send a message to the bot as a simulated chat user
    #[command(arg_required_else_help = true)]
    Talk {
        /// Channel ID
        #[arg(long, default_value = "cli")]
        channel_id: String,

        /// User ID
        #[arg(short, long)]
        user_id: String,

        /// Display name returned for identity lookups
        #[arg(short = 'n', long)]
        display_name: Option<String>,

        /// Mark the sender as a bot account
        #[arg(short, long)]
        bot: bool,

        message: String,
    },
}

async fn send<S>(sender: &mut S, req: &SocketMessage) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Send + Sync + std::error::Error + 'static,
{
    sender
        .send(Message::Text(
            serde_json::to_string(req).unwrap().into(),
        ))
        .await
        .context("Failed to send!")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.log_level_filter().as_trace())
        .init();
    let connect = args.connect;
    let auth = args.auth;

    let url = Url::parse(&format!("ws://{}/ws", connect)).unwrap();
    let mut request = url.into_client_request().unwrap();
    let headers = request.headers_mut();
    let auth_value = HeaderValue::from_str(&auth).unwrap();
    headers.insert("Authorization", auth_value);
    let ws_stream = match connect_async(request).await {
        Ok((stream, response)) => {
            debug!("Handshake for client has been completed");
            debug!("Server response was {response:?}");
            stream
        }
        Err(e) => {
            error!("WebSocket handshake for client failed with {e}!");
            return Ok(());
        }
    };

    let (mut sender, mut receiver) = ws_stream.split();
    match args.command {
        Commands::Talk {
            channel_id,
            user_id,
            display_name,
            bot,
            message,
        } => {
            let req = SocketMessage::MessageEvent(MessageEvent {
                channel_id,
                sender_id: user_id.clone(),
                sender_is_bot: bot,
                body: message,
            });
            debug!("Request: {:?}", req);

            send(&mut sender, &req).await?;

            // Print replies and stand in for the platform's identity
            // lookups until the server hangs up.
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(t) => {
                        match serde_json::from_slice::<SocketMessage>(t.as_bytes()) {
                            Ok(SocketMessage::SendMessage { channel_id, text }) => {
                                println!("[{channel_id}] {text}");
                            }
                            Ok(SocketMessage::ResolveUser { seq, user_id: id }) => {
                                let name = display_name.clone().unwrap_or_else(|| id.clone());
                                let res = SocketMessage::ResolveUserResponse {
                                    seq,
                                    display_name: Some(name),
                                };
                                send(&mut sender, &res).await?;
                            }
                            _ => println!("{}", t.as_str()),
                        }
                    }
                    _ => println!("Unrecognized message"),
                }
            }
        }
    }
    Ok(())
}
