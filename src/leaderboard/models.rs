use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Length of the trailing window scores are summed over
pub const STANDINGS_WINDOW_DAYS: i64 = 7;

/// Window edges are snapped down to this many seconds
pub const WINDOW_ALIGNMENT_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_id: String,
    pub score: i64,
}

impl PlayerScore {
    pub fn new(player_id: impl Into<String>, score: i64) -> Self {
        Self {
            player_id: player_id.into(),
            score,
        }
    }
}

/// Point-in-time ranking. Sorted by score descending; ties keep store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub sorted_standings: Vec<PlayerScore>,
    pub last_updated: DateTime<Utc>,
}

impl Standings {
    pub fn empty(last_updated: DateTime<Utc>) -> Self {
        Self {
            sorted_standings: Vec::new(),
            last_updated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_standings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandingsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StandingsWindow {
    /// The 7-day window ending at `now`, floored to a 5-minute boundary
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        let end = align_down(now);
        Self {
            start: end - Duration::days(STANDINGS_WINDOW_DAYS),
            end,
        }
    }
}

fn align_down(now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = now.timestamp();
    let aligned = secs - secs.rem_euclid(WINDOW_ALIGNMENT_SECS);
    DateTime::from_timestamp(aligned, 0).unwrap_or(now)
}
