pub mod aggregator;
pub mod pinned;
pub mod presenter;
pub mod recorder;
pub mod service;

mod errors;
pub mod models;

pub use aggregator::StandingsAggregator;
pub use errors::LeaderboardError;
pub use models::*;
pub use pinned::PinnedLeaderboard;
pub use presenter::{DisplayDocument, DisplayField, RenderOptions, ScoreUnit, StandingsPresenter};
pub use recorder::ScoreRecorder;
pub use service::LeaderboardService;

/// Metric name every player score is recorded under
pub const PLAYER_SCORE_METRIC: &str = "PlayerScore";

/// Dimension carrying the player's stable identifier
pub const PLAYER_ID_DIMENSION: &str = "PlayerId";

const NAMESPACE_SUFFIX: &str = "Leaderboard";

/// Metrics namespace for a deployment, e.g. `"smp"` -> `"smp/Leaderboard"`
pub fn leaderboard_namespace(prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        NAMESPACE_SUFFIX.to_string()
    } else {
        format!("{prefix}/{NAMESPACE_SUFFIX}")
    }
}
