use serde::{Deserialize, Serialize};

use crate::leaderboard::DisplayDocument;

/// Interaction and response type codes used on the wire
pub mod interaction_type {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;

    pub const PONG: u8 = 1;
    pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub data: Option<CommandData>,
}

impl Interaction {
    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.name.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandData {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub fields: Vec<EmbedField>,
}

impl From<&DisplayDocument> for Embed {
    fn from(document: &DisplayDocument) -> Self {
        Self {
            title: document.title.clone(),
            fields: document
                .all_fields()
                .map(|field| EmbedField {
                    name: field.name.clone(),
                    value: field.value.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: interaction_type::PONG,
            data: None,
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: interaction_type::CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseData {
                content: Some(content.into()),
                embeds: Vec::new(),
            }),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            kind: interaction_type::CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseData {
                content: None,
                embeds: vec![embed],
            }),
        }
    }
}
