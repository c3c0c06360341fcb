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

//! Filesystem and external-tool plumbing for the transfer pipeline.
//!
//! Layout: `locate.rs` (misplaced-data search), `process.rs` (streaming
//! subprocess runner), `progress.rs` (copy-tool output classification and
//! milestone throttling), `copy.rs` (copy-tool driver), `extract.rs`
//! (archive extraction), `ownership.rs` (owner-aware directory creation).

pub mod copy;
pub mod error;
pub mod extract;
pub mod locate;
pub mod ownership;
pub mod process;
pub mod progress;

pub use copy::{CopyOutcome, CopyRunner, with_trailing_separator};
pub use error::{FsOpsError, FsOpsResult};
pub use extract::{ArchiveLayout, ArchiveOutcome, Extractor, find_archives, is_rar};
pub use locate::LocationResolver;
pub use ownership::ensure_dir_owned;
pub use process::{CommandSpec, OutputLine, ProcessExit, StreamSource, run_streaming};
pub use progress::{LineKind, MilestoneTracker, classify};
