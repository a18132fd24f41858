use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use fish_arena_server::config::{GameConfig, ServerConfig};
use fish_arena_server::game::state::PlayerInfo;
use fish_arena_server::metrics::Metrics;
use fish_arena_server::net::protocol::ServerMessage;
use fish_arena_server::net::transport::ChannelTransport;
use fish_arena_server::server::SessionRegistry;

const BOT_COLORS: [&str; 6] = ["#ff6b6b", "#ffd93d", "#6bcb77", "#4d96ff", "#c77dff", "#ff9f1c"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Fish Arena Server v{}", env!("CARGO_PKG_VERSION"));

    let game_config = GameConfig::load_or_default();
    game_config.validate()?;
    let server_config = ServerConfig::load_or_default();
    info!(
        "Configuration loaded: {}x{} arena, {} ms ticks, {} s matches, {} bots ({})",
        game_config.arena.width,
        game_config.arena.height,
        game_config.timing.tick_interval_ms,
        game_config.timing.match_duration_ms / 1000,
        server_config.bot_count,
        game_config.bot.difficulty
    );

    let metrics = Arc::new(Metrics::new());

    #[cfg(feature = "metrics")]
    {
        let metrics_clone = metrics.clone();
        let port = server_config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = fish_arena_server::metrics::start_metrics_server(metrics_clone, port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    let (transport, mut outbound) = ChannelTransport::new();
    let registry = SessionRegistry::new(Arc::new(transport), Arc::new(game_config), metrics.clone());

    // Stand-in for the room messaging layer
    let forwarder = tokio::spawn(async move {
        while let Some(out) = outbound.recv().await {
            let size = match out.encoded() {
                Ok(bytes) => bytes.len(),
                Err(e) => {
                    warn!("Failed to encode {}: {}", out.message.kind(), e);
                    continue;
                }
            };
            match &out.message {
                ServerMessage::Snapshot(snapshot) => debug!(
                    "[{}] snapshot tick={} players={} npcs={} powerups={} events={} ({} bytes)",
                    out.session_id,
                    snapshot.tick,
                    snapshot.players.len(),
                    snapshot.npcs.len(),
                    snapshot.powerups.len(),
                    snapshot.events.len(),
                    size
                ),
                ServerMessage::Ended(result) => {
                    info!(
                        "[{}] match ended after {} s, winner: {}",
                        out.session_id,
                        result.duration_ms / 1000,
                        result.winner_name.as_deref().unwrap_or("draw")
                    );
                    for entry in &result.rankings {
                        info!("  #{} {} ({} xp)", entry.rank, entry.display_name, entry.xp);
                    }
                }
                other => debug!("[{}] {} ({} bytes)", out.session_id, other.kind(), size),
            }
        }
    });

    let mut roster = vec![PlayerInfo::new("Host", "#ffffff").leader()];
    roster.extend((0..server_config.bot_count).map(|i| {
        PlayerInfo::new(format!("Bot {}", i + 1), BOT_COLORS[i % BOT_COLORS.len()]).bot()
    }));

    let session_id = Uuid::new_v4();
    registry.start_session(session_id, Uuid::new_v4(), roster)?;

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    let finished = {
        let registry = registry.clone();
        async move {
            let mut poll = tokio::time::interval(Duration::from_secs(1));
            while registry.session_count() > 0 {
                poll.tick().await;
            }
            info!("All sessions finished");
        }
    };

    tokio::select! {
        _ = shutdown => info!("Shutting down..."),
        _ = finished => {}
    }

    registry.shutdown().await;
    drop(registry);
    if let Err(e) = forwarder.await {
        warn!("Outbound forwarder ended abnormally: {}", e);
    }
    info!("Server stopped");

    Ok(())
}
