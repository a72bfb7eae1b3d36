pub mod fake_discord;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use fake_discord::{FakeDiscord, FAKE_BOT_TOKEN};
#[allow(unused_imports)]
pub use mocks::{CountingGateway, MockChatTransport, TransportCall, UnavailableGateway};
#[allow(unused_imports)]
pub use setup::{base_time, TestSetup, TestSetupBuilder, BOT_USER_ID, CHANNEL_NAME};
