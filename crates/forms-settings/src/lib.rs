//! OpenSASE Forms Settings
//!
//! Application settings held in an external store, read through an
//! in-memory cache with manual invalidation.

#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod store;

pub use cache::SettingsCache;
pub use error::{Result, SettingsError};
pub use store::{InMemorySettingsStore, SettingsStore};
