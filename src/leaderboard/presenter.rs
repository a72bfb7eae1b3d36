use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::{LeaderboardError, Standings};
use crate::names::NameResolver;

pub const STANDINGS_TITLE: &str = "biggest nerds on the server\n(in the last 7 days)";
pub const LAST_UPDATED_LABEL: &str = "*last updated:*";

/// Same layout as the Unix `date` command, e.g. `Fri May 10 05:15:00 PDT 2024`
const LAST_UPDATED_FORMAT: &str = "%a %b %e %H:%M:%S %Z %Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayField {
    pub name: String,
    pub value: String,
}

/// Platform-agnostic rendering of a ranking. Transports map it onto their own
/// message structures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDocument {
    pub title: String,
    pub fields: Vec<DisplayField>,
    pub last_updated: Option<DisplayField>,
}

impl DisplayDocument {
    /// Ranking fields followed by the freshness field, if any
    pub fn all_fields(&self) -> impl Iterator<Item = &DisplayField> {
        self.fields.iter().chain(self.last_updated.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreUnit {
    pub singular: String,
    pub plural: String,
}

impl Default for ScoreUnit {
    fn default() -> Self {
        Self {
            singular: "cat treat".to_string(),
            plural: "cat treats".to_string(),
        }
    }
}

impl ScoreUnit {
    pub fn phrase(&self, score: i64) -> String {
        let unit = if score == 1 {
            &self.singular
        } else {
            &self.plural
        };
        format!("{score} {unit}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub include_last_updated: bool,
}

impl RenderOptions {
    pub fn with_last_updated() -> Self {
        Self {
            include_last_updated: true,
        }
    }
}

/// Turns standings into a [`DisplayDocument`], resolving player names
pub struct StandingsPresenter {
    names: Arc<dyn NameResolver>,
    unit: ScoreUnit,
    timezone: Tz,
}

impl StandingsPresenter {
    pub fn new(names: Arc<dyn NameResolver>) -> Self {
        Self {
            names,
            unit: ScoreUnit::default(),
            timezone: chrono_tz::America::Los_Angeles,
        }
    }

    pub fn with_unit(mut self, unit: ScoreUnit) -> Self {
        self.unit = unit;
        self
    }

    /// All names must resolve; the first failed lookup fails the render.
    #[instrument(skip(self, standings), fields(players = standings.sorted_standings.len()))]
    pub async fn render(
        &self,
        standings: &Standings,
        options: RenderOptions,
    ) -> Result<DisplayDocument, LeaderboardError> {
        let mut fields = Vec::with_capacity(standings.sorted_standings.len());
        for standing in &standings.sorted_standings {
            let name = self
                .names
                .get_username(&standing.player_id)
                .await
                .map_err(|err| {
                    warn!(player_id = %standing.player_id, error = %err, "Failed to resolve player name");
                    err
                })?;
            fields.push(DisplayField {
                name,
                value: self.unit.phrase(standing.score),
            });
        }

        let last_updated = options.include_last_updated.then(|| DisplayField {
            name: LAST_UPDATED_LABEL.to_string(),
            value: format_last_updated(standings.last_updated, self.timezone),
        });

        Ok(DisplayDocument {
            title: STANDINGS_TITLE.to_string(),
            fields,
            last_updated,
        })
    }
}

pub fn format_last_updated(timestamp: DateTime<Utc>, timezone: Tz) -> String {
    timestamp
        .with_timezone(&timezone)
        .format(LAST_UPDATED_FORMAT)
        .to_string()
}
