// Pinned, reaction-refreshable messages.
//
// One message per guild lives in a channel with a configured name. The bot
// keeps a single refresh reaction on it; when someone else adds that reaction
// the message is re-rendered in place.

pub use errors::RefreshableError;
pub use handler::{
    GuildSetup, GuildState, ReactionOutcome, RefreshableConfig, RefreshableHandler,
    REFRESH_EMOJI,
};
pub use registry::{MessageRegistry, TrackedMessage};
pub use transport::{Channel, ChatTransport, Guild, Message, ReactionAdd, RefreshableBackend};

mod errors;
mod handler;
mod registry;
pub mod transport;
