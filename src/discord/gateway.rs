use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use twilight_gateway::{Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_model::channel::message::EmojiReactionType;
use twilight_model::gateway::payload::incoming::Ready;
use twilight_model::gateway::GatewayReaction;

use crate::refreshable::{Guild, ReactionAdd, ReactionOutcome, RefreshableHandler};

pub fn gateway_intents() -> Intents {
    Intents::GUILDS | Intents::GUILD_MESSAGE_REACTIONS
}

fn wanted_events() -> EventTypeFlags {
    EventTypeFlags::READY | EventTypeFlags::REACTION_ADD
}

/// Feeds gateway events into the refresh protocol until the connection closes for good.
/// Each event is handled on its own task so a slow guild never stalls the stream.
#[instrument(skip_all)]
pub async fn run_gateway(bot_token: String, handler: Arc<RefreshableHandler>) {
    let mut shard = Shard::new(ShardId::ONE, bot_token, gateway_intents());
    info!("Connecting to the Discord gateway");

    while let Some(item) = shard.next_event(wanted_events()).await {
        match item {
            Ok(event) => dispatch(event, &handler),
            Err(e) => warn!(error = %e, "Error receiving gateway event"),
        }
    }

    error!("Discord gateway stream ended");
}

fn dispatch(event: Event, handler: &Arc<RefreshableHandler>) {
    match event {
        Event::Ready(ready) => {
            let guilds = ready_guilds(&ready);
            info!(guilds = guilds.len(), user_id = %ready.user.id, "Gateway ready");
            let handler = handler.clone();
            tokio::spawn(async move {
                for setup in handler.on_ready(&guilds).await {
                    if let Err(e) = setup.result {
                        error!(guild_id = %setup.guild_id, error = %e, "Guild setup failed");
                    }
                }
            });
        }
        Event::ReactionAdd(reaction) => {
            let Some(event) = reaction_event(&reaction) else {
                return;
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                match handler.on_reaction_add(&event).await {
                    Ok(ReactionOutcome::Refreshed) => {
                        info!(guild_id = %event.guild_id, "Pinned message refreshed")
                    }
                    Ok(outcome) => debug!(?outcome, "Reaction ignored"),
                    Err(e) => error!(guild_id = %event.guild_id, error = %e, "Refresh failed"),
                }
            });
        }
        _ => {}
    }
}

/// Guilds listed in READY. Names arrive later, so the id stands in.
pub fn ready_guilds(ready: &Ready) -> Vec<Guild> {
    ready
        .guilds
        .iter()
        .map(|guild| Guild {
            id: guild.id.to_string(),
            name: guild.id.to_string(),
        })
        .collect()
}

/// Reactions outside a guild are dropped
pub fn reaction_event(reaction: &GatewayReaction) -> Option<ReactionAdd> {
    let guild_id = reaction.guild_id?;
    Some(ReactionAdd {
        guild_id: guild_id.to_string(),
        channel_id: reaction.channel_id.to_string(),
        message_id: reaction.message_id.to_string(),
        user_id: reaction.user_id.to_string(),
        emoji: emoji_name(&reaction.emoji),
    })
}

/// Unicode emoji as is, custom emoji as `name:id`
pub fn emoji_name(emoji: &EmojiReactionType) -> String {
    match emoji {
        EmojiReactionType::Unicode { name } => name.clone(),
        EmojiReactionType::Custom { id, name, .. } => {
            format!("{}:{id}", name.as_deref().unwrap_or_default())
        }
    }
}
