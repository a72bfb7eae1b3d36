pub mod ping;
pub mod sampler;

pub use ping::{DnsSrvResolver, ServerAddress, ServerListPing, SrvResolver};
pub use sampler::{
    sample_once, start_presence_task, OnlinePlayer, OnlinePlayers, PresenceConfig, PresenceError,
    StaticOnlinePlayers,
};
