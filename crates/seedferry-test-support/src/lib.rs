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

//! Shared test helpers used across the workspace.
//! Layout: fixtures.rs (record builders, filesystem helpers), fake.rs (in-memory torrent client).

pub mod fake;
pub mod fixtures;

pub use fake::{FakeCall, FakeClient};
pub use fixtures::{RecordBuilder, write_file};
