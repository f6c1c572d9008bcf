//! # evently-core
//!
//! Core types, traits, and abstractions for the evently RSVP service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the storage, notification, calendar and API crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
#[cfg(feature = "mock")]
pub mod mock;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
