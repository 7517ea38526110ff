//! Connection reuse.

pub mod cache;

pub use cache::{ConnectionCache, PoolKey, PoolStats};
