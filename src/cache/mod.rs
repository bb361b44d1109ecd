//! Per-capture asset caching and the replaying channels it publishes on.

mod asset_cache;
mod replay;

pub use asset_cache::{AssetCache, PendingFetch};
pub use replay::{Replay, Subscription};
