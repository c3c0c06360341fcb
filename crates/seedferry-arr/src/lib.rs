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
#![allow(clippy::module_name_repetitions)]

//! Read-only client for the queue API of Sonarr-style applications.
//!
//! The queue is consulted for import failures caused by payload paths that
//! never arrived locally; see [`MissingPath`].

pub mod client;
pub mod error;
pub mod model;

pub use client::ArrClient;
pub use error::{ArrError, ArrResult};
pub use model::{MissingPath, QueuePage, QueueRecord, StatusMessage};
