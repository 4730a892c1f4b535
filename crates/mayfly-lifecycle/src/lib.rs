//! Link lifecycle orchestration for the Mayfly URL shortener.
//!
//! This crate ties the core pieces together:
//!
//! - [`CodeAllocator`] produces collision-free short codes and resolves
//!   custom-alias conflicts.
//! - [`LifecycleService`] orchestrates create and reschedule flows:
//!   persist first, then register the deadline with the tracker.
//! - [`Reconciler`] periodically sweeps due deadlines and deletes the
//!   corresponding links from the persistent store, at-least-once.

pub mod allocator;
pub mod error;
pub mod reconciler;
pub mod service;

pub use allocator::{AllocatorSettings, CodeAllocator};
pub use error::LifecycleError;
pub use reconciler::{Reconciler, ReconcilerSettings, TickSummary};
pub use service::{CreateLink, CreatedLink, LifecycleService};
