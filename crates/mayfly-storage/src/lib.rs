//! [`LinkStore`](mayfly_core::LinkStore) implementations.
//!
//! `memory` backs unit tests and single-process deployments; `postgres`
//! is the production store.

pub mod memory;
pub mod postgres;

pub use memory::MemoryLinkStore;
pub use postgres::PgLinkStore;
