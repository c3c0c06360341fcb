#![forbid(unsafe_code)]
#![warn(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-driven configuration for the reconciliation service.
//!
//! Layout: `model.rs` (typed configuration), `loader.rs` (environment lookup),
//! `validate.rs` (field parsers), `defaults.rs` (documented fallbacks).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    ArrInstanceConfig, InstanceConfig, LogSettings, Ownership, ProgressSettings, Protocol,
    SyncConfig, ToolSettings,
};
