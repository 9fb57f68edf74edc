//! Megaverse — rebuild a goal grid on a remote map service, one cell at a time.

pub mod classify;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod goal;
pub mod retry;
pub mod types;

pub use classify::classify;
pub use client::MegaverseClient;
pub use config::{ConfigOverrides, MegaverseConfig};
pub use dispatch::{run, Dispatcher, PlannedRequest, RunPhase};
pub use goal::fetch_goal;
pub use retry::{RetryPolicy, RetryState};
pub use types::*;
