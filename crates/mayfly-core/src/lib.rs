//! Core types and traits for the Mayfly link lifecycle service.
//!
//! This crate provides the shared data model and the contracts implemented
//! by the storage and tracker backends.

pub mod error;
pub mod link;
pub mod shortcode;
pub mod store;
pub mod tracker;

pub use error::{CoreError, StorageError, TrackerError};
pub use link::LinkRecord;
pub use shortcode::ShortCode;
pub use store::LinkStore;
pub use tracker::ExpirationTracker;
