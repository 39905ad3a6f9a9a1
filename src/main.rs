//! duelhalld - text-protocol card duel lobby server.
//!
//! Sessions, command dispatch, prompts, broadcast channels and room
//! staging run on a single dispatch task; the rules core and persistence
//! sit behind trait and repository boundaries.

use duelhall::cards::CardStore;
use duelhall::config::Config;
use duelhall::db::Database;
use duelhall::engine::NullEngine;
use duelhall::handlers::build_modes;
use duelhall::network::Gateway;
use duelhall::state::Hall;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "duelhall.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server.name,
        addr = %config.listen.addr,
        "Starting duelhalld"
    );

    let db = Database::new(&config.database.path).await?;

    let cards = match CardStore::load(&config.game.cards_path) {
        Ok(cards) => {
            info!(count = cards.len(), "Loaded card store");
            cards
        }
        Err(e) => {
            warn!(
                path = %config.game.cards_path,
                error = %e,
                "Card store unavailable, starting empty"
            );
            CardStore::new()
        }
    };

    let modes = build_modes();
    let (events_tx, events_rx) = mpsc::channel(1024);
    let gateway = Gateway::bind(&config.listen.addr, events_tx, config.listen.outbound_queue).await?;

    let hall = Hall::new(
        Arc::new(config),
        db,
        Arc::new(cards),
        Arc::new(NullEngine),
        modes,
    );

    tokio::spawn(gateway.run());
    hall.run(events_rx).await;
    Ok(())
}
