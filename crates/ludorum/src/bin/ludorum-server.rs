//! Server bootstrap: flags, logging, dev ports.
//!
//! Runs the server with a development identity (tokens of the form
//! `id:name`) and no durable storage. Real deployments build on
//! [`ludorum::ServerBuilder`] with their own identity and persistence
//! ports; this binary is the local/smoke-test wiring.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ludorum::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative realtime Ludo server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Seconds per turn before the miss counter ticks.
    #[arg(long, default_value_t = 30)]
    turn_limit: u32,

    /// Seconds a disconnected player keeps their seat.
    #[arg(long, default_value_t = 30)]
    reconnect_grace: u64,

    /// Missed turns before a seat is forfeited.
    #[arg(long, default_value_t = 5)]
    max_inactive_turns: u8,
}

/// Development identity: accepts `id:name` tokens verbatim.
struct DevIdentity;

impl Identity for DevIdentity {
    async fn resolve(&self, token: &str) -> Result<UserProfile, SessionError> {
        let (id, name) = token
            .split_once(':')
            .ok_or_else(|| SessionError::AuthFailed("token must be id:name".into()))?;
        if id.is_empty() || name.is_empty() {
            return Err(SessionError::AuthFailed("empty id or name".into()));
        }
        Ok(UserProfile {
            user_id: UserId::from(id),
            display_name: name.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RoomConfig {
        rules: Rules {
            turn_limit_secs: args.turn_limit,
            max_inactive_turns: args.max_inactive_turns,
            ..Rules::default()
        },
        reconnect_grace: Duration::from_secs(args.reconnect_grace),
        ..RoomConfig::default()
    };

    let server = ServerBuilder::new()
        .bind(&args.bind)
        .room_config(config)
        .build(DevIdentity, Arc::new(NoPersistence))
        .await?;

    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await?;
    Ok(())
}
