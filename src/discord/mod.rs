// Discord wiring for the refresh protocol: REST calls back the chat transport,
// a gateway shard delivers READY and reaction events.

pub use gateway::{emoji_name, gateway_intents, reaction_event, ready_guilds, run_gateway};
pub use rest::{DiscordRestTransport, DISCORD_API_BASE_URL};

mod gateway;
mod rest;
