//! New-pair detection
//!
//! Polls the factory's `PairCreated` logs from the last block seen, keeps
//! pairs that include the wrapped native asset and reports the other token
//! with its first quote.

mod types;
mod watcher;

pub use types::NewPair;
pub use watcher::{PairFeed, PairWatcher, DEFAULT_MAX_BLOCK_RANGE, DEFAULT_POLL_INTERVAL};
