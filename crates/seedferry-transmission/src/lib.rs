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

//! Transmission RPC adapter implementing [`seedferry_torrent_core::TorrentClient`].
//!
//! Layout: `client.rs` (HTTP transport and session handshake), `wire.rs`
//! (request/response payloads and record conversion), `error.rs`.

pub mod client;
pub mod error;
pub mod wire;

pub use client::{SESSION_HEADER, TransmissionClient};
pub use error::{TransmissionError, TransmissionResult};
