// Minecraft player id <-> username lookups

pub use playerdb::PlayerDbResolver;
pub use resolver::{InMemoryNameResolver, NameError, NameResolver};

mod playerdb;
mod resolver;
