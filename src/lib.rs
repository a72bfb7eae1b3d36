// Library crate for the tonkatsu leaderboard bot
// This file exposes the public API for integration tests

pub mod clock;
pub mod config;
pub mod discord;
pub mod interactions;
pub mod leaderboard;
pub mod metrics;
pub mod names;
pub mod presence;
pub mod refreshable;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, ConfigError, MetricsBackend};
pub use leaderboard::{
    LeaderboardError, LeaderboardService, PinnedLeaderboard, PlayerScore, Standings,
    StandingsPresenter,
};
pub use metrics::{CloudWatchMetricsGateway, InMemoryMetricsGateway, MetricsError, MetricsGateway};
pub use names::{InMemoryNameResolver, NameError, NameResolver, PlayerDbResolver};
pub use refreshable::{RefreshableError, RefreshableHandler};
pub use shared::{AppError, AppState};
