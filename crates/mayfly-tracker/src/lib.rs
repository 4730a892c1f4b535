//! [`ExpirationTracker`](mayfly_core::ExpirationTracker) implementations.
//!
//! Both backends keep an explicit `code -> deadline` index with no
//! auto-eviction: a due entry remains visible until the reconciler removes
//! it after a successful delete. This is what makes "which codes expired?"
//! an exact query instead of a race against a cache's eviction timing, and
//! it structurally separates "never scheduled" from "elapsed".

pub mod memory;
pub mod redis;

pub use memory::MemoryDeadlineIndex;
pub use redis::RedisDeadlineIndex;
