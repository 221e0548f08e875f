//! OpenSASE Forms Prefill
//!
//! Resolves field default values from the internal context, remote HTTP
//! endpoints, or static lookup tables.
//!
//! ```text
//! PrefillConfig ─► PrefillService ─┬─ internal ─► context dot-path
//!                                  ├─ lookup   ─► registered table
//!                                  └─ api      ─► PrefillCache ─► HttpFetcher (retry + backoff)
//! ```

#![warn(clippy::all)]

pub mod cache;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod service;

pub use cache::PrefillCache;
pub use context::lookup_path;
pub use error::{PrefillError, Result};
pub use fetcher::{HttpFetcher, ReqwestFetcher};
pub use service::{PrefillOptions, PrefillResult, PrefillService, DEFAULT_RETRY_ATTEMPTS};
