use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avalon::{
    config::{GameConfig, LogConfig},
    handlers::handle_message,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Logs go to stderr; stdout carries replies only
    let log_config = LogConfig::from_env();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&log_config.filter)
                .unwrap_or_else(|_| LogConfig::default().filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let game_config = GameConfig::from_env();
    tracing::info!(?game_config, "Starting Avalon host console...");
    let state = AppState::with_config(game_config);

    // Log state updates broadcast to the room
    let mut updates = state.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(ServerMessage::GameState { room_id, state, .. }) => {
                    tracing::debug!(%room_id, phase = %state.phase, round = state.round, "Broadcast state");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Update logger lagged, skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ClientMessage>(line) {
            Ok(msg) => handle_message(msg, &state).await,
            Err(e) => {
                tracing::warn!("Failed to parse message: {}", e);
                Some(ServerMessage::Error {
                    code: "BAD_MESSAGE".to_string(),
                    msg: e.to_string(),
                })
            }
        };

        if let Some(reply) = reply {
            let mut json = serde_json::to_string(&reply).map_err(io::Error::other)?;
            json.push('\n');
            stdout.write_all(json.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
