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

//! Client-agnostic torrent snapshot types and the capability trait implemented by
//! torrent client adapters.
//!
//! Layout: `model/` (snapshot DTOs and status codes), `service/` (`TorrentClient`),
//! `error.rs` (`TorrentError`).

pub mod error;
pub mod model;
pub mod service;

pub use error::{TorrentError, TorrentResult};
pub use model::{AddTorrent, KnownCondition, TorrentFile, TorrentRecord, TorrentState};
pub use service::{TorrentClient, UnavailableClient};
