use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonkatsu::config::MetricsBackend;
use tonkatsu::discord::{run_gateway, DiscordRestTransport};
use tonkatsu::interactions::{self, DiscordPublicKey};
use tonkatsu::metrics::CloudWatchMetricsGateway;
use tonkatsu::presence::{start_presence_task, DnsSrvResolver, PresenceConfig, ServerListPing};
use tonkatsu::refreshable::{MessageRegistry, RefreshableConfig};
use tonkatsu::{
    AppState, Config, InMemoryMetricsGateway, LeaderboardService, MetricsGateway,
    PinnedLeaderboard, PlayerDbResolver, RefreshableHandler, StandingsPresenter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonkatsu=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    info!(
        namespace_prefix = %config.namespace_prefix,
        metrics_backend = %config.metrics_backend,
        "Starting tonkatsu leaderboard bot"
    );

    let gateway: Arc<dyn MetricsGateway> = match config.metrics_backend {
        MetricsBackend::CloudWatch => Arc::new(CloudWatchMetricsGateway::from_env().await),
        MetricsBackend::Memory => Arc::new(InMemoryMetricsGateway::new()),
    };
    let leaderboard = Arc::new(LeaderboardService::new(gateway, &config.namespace_prefix));
    let names = Arc::new(PlayerDbResolver::new(config.call_timeout)?);
    let presenter = Arc::new(StandingsPresenter::new(names));

    match &config.minecraft_server_host {
        Some(server) => {
            let source = ServerListPing::new(server, Arc::new(DnsSrvResolver::from_system_conf()?));
            tokio::spawn(start_presence_task(
                Arc::new(source),
                leaderboard.clone(),
                PresenceConfig {
                    interval: config.presence_interval,
                    points_per_sample: config.presence_points,
                    call_timeout: config.call_timeout,
                },
            ));
        }
        None => info!("No MINECRAFT_SERVER_HOST configured, presence sampling disabled"),
    }

    match &config.discord_bot_token {
        Some(token) => {
            let transport = Arc::new(DiscordRestTransport::new(token, config.call_timeout)?);
            let handler = Arc::new(RefreshableHandler::new(
                transport,
                Arc::new(PinnedLeaderboard::new(leaderboard.clone(), presenter.clone())),
                Arc::new(MessageRegistry::new()),
                RefreshableConfig::new(config.pinned_channel_name.clone())
                    .with_call_timeout(config.call_timeout),
            ));
            info!(pinned_channel = %config.pinned_channel_name, "Pinned leaderboard enabled");
            tokio::spawn(run_gateway(token.clone(), handler));
        }
        None => info!("No DISCORD_BOT_TOKEN configured, pinned leaderboard disabled"),
    }

    let public_key = DiscordPublicKey::from_hex(&config.webhook_public_key)?;
    let app_state = AppState::new(leaderboard, presenter, public_key, config.call_timeout);
    let app = interactions::router(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Interactions webhook listening");
    axum::serve(listener, app).await?;
    Ok(())
}
