//! In-memory [`TorrentClient`] that mutates its own snapshot and records every call.
//!
//! State transitions approximate a real client closely enough for multi-cycle
//! convergence tests:
//! - `start` moves a complete torrent to seeding and an incomplete one to downloading.
//! - `stop` pauses the torrent and clears its error text.
//! - `move_data` updates the download directory.
//! - `verify` clears the error text and sets completion to the value
//!   configured with [`FakeClient::verify_result`] (100 by default).
//! - `add` inserts the record registered for the metainfo with
//!   [`FakeClient::register_metainfo`], or a bare record otherwise.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use seedferry_torrent_core::{
    AddTorrent, TorrentClient, TorrentError, TorrentRecord, TorrentResult, TorrentState,
};

/// A call observed by the fake, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    /// `start(info_hash)`.
    Start(String),
    /// `stop(info_hash)`.
    Stop(String),
    /// `move_data(info_hash, location)`.
    Move {
        /// Addressed torrent.
        info_hash: String,
        /// Requested location.
        location: String,
    },
    /// `verify(info_hash)`.
    Verify(String),
    /// `add(request)`.
    Add {
        /// Requested download directory.
        download_dir: String,
        /// Requested paused flag.
        paused: bool,
        /// Size of the submitted metainfo.
        metainfo_len: usize,
    },
}

#[derive(Debug, Default)]
struct FakeState {
    torrents: Vec<TorrentRecord>,
    calls: Vec<FakeCall>,
    list_calls: usize,
    failing: HashSet<&'static str>,
    catalog: HashMap<Vec<u8>, TorrentRecord>,
    verify_results: HashMap<String, f64>,
    added: usize,
}

/// Stateful fake torrent client.
#[derive(Debug, Default)]
pub struct FakeClient {
    label: String,
    state: Mutex<FakeState>,
}

impl FakeClient {
    /// Fake labelled `label` holding `torrents`.
    #[must_use]
    pub fn new(label: &str, torrents: Vec<TorrentRecord>) -> Self {
        Self {
            label: label.to_string(),
            state: Mutex::new(FakeState {
                torrents,
                ..FakeState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call of `operation` (`list`, `start`, `stop`, `move_data`,
    /// `verify`, `add`) fail. Mutating calls are still recorded.
    pub fn fail(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    /// Record inserted when `metainfo` is added.
    pub fn register_metainfo(&self, metainfo: &[u8], record: TorrentRecord) {
        self.lock().catalog.insert(metainfo.to_vec(), record);
    }

    /// Completion percentage `verify` leaves behind for `info_hash`.
    pub fn verify_result(&self, info_hash: &str, percent: f64) {
        self.lock()
            .verify_results
            .insert(info_hash.to_string(), percent);
    }

    /// Replace the held snapshot.
    pub fn set_torrents(&self, torrents: Vec<TorrentRecord>) {
        self.lock().torrents = torrents;
    }

    /// Current snapshot.
    #[must_use]
    pub fn torrents(&self) -> Vec<TorrentRecord> {
        self.lock().torrents.clone()
    }

    /// Record for `info_hash`, if held.
    #[must_use]
    pub fn torrent(&self, info_hash: &str) -> Option<TorrentRecord> {
        self.lock()
            .torrents
            .iter()
            .find(|record| record.info_hash == info_hash)
            .cloned()
    }

    /// Mutating calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<FakeCall> {
        self.lock().calls.clone()
    }

    /// Number of `list` calls observed so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Forget observed calls.
    pub fn clear_calls(&self) {
        let mut state = self.lock();
        state.calls.clear();
        state.list_calls = 0;
    }

    fn mutate(
        &self,
        operation: &'static str,
        call: FakeCall,
        info_hash: &str,
        apply: impl FnOnce(&mut TorrentRecord, &HashMap<String, f64>),
    ) -> TorrentResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.calls.push(call);
        if state.failing.contains(operation) {
            return Err(injected(operation));
        }
        if let Some(record) = state
            .torrents
            .iter_mut()
            .find(|record| record.info_hash == info_hash)
        {
            apply(record, &state.verify_results);
        }
        Ok(())
    }
}

fn injected(operation: &'static str) -> TorrentError {
    TorrentError::Rejected {
        operation,
        reason: "injected failure".to_string(),
    }
}

#[async_trait]
impl TorrentClient for FakeClient {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list(&self) -> TorrentResult<Vec<TorrentRecord>> {
        let mut state = self.lock();
        state.list_calls += 1;
        if state.failing.contains("list") {
            return Err(injected("list"));
        }
        Ok(state.torrents.clone())
    }

    async fn start(&self, info_hash: &str) -> TorrentResult<()> {
        self.mutate(
            "start",
            FakeCall::Start(info_hash.to_string()),
            info_hash,
            |record, _| {
                record.state = if record.is_complete() {
                    TorrentState::Seeding
                } else {
                    TorrentState::Downloading
                };
            },
        )
    }

    async fn stop(&self, info_hash: &str) -> TorrentResult<()> {
        self.mutate(
            "stop",
            FakeCall::Stop(info_hash.to_string()),
            info_hash,
            |record, _| {
                record.state = TorrentState::Stopped;
                record.error_string.clear();
            },
        )
    }

    async fn move_data(&self, info_hash: &str, location: &str) -> TorrentResult<()> {
        self.mutate(
            "move_data",
            FakeCall::Move {
                info_hash: info_hash.to_string(),
                location: location.to_string(),
            },
            info_hash,
            |record, _| record.download_dir = location.to_string(),
        )
    }

    async fn verify(&self, info_hash: &str) -> TorrentResult<()> {
        self.mutate(
            "verify",
            FakeCall::Verify(info_hash.to_string()),
            info_hash,
            |record, verify_results| {
                record.error_string.clear();
                record.percent_done = verify_results
                    .get(&record.info_hash)
                    .copied()
                    .unwrap_or(100.0);
            },
        )
    }

    async fn add(&self, request: AddTorrent) -> TorrentResult<()> {
        let mut state = self.lock();
        state.calls.push(FakeCall::Add {
            download_dir: request.download_dir.clone(),
            paused: request.paused,
            metainfo_len: request.metainfo.len(),
        });
        if state.failing.contains("add") {
            return Err(injected("add"));
        }
        state.added += 1;
        let mut record = state
            .catalog
            .get(&request.metainfo)
            .cloned()
            .unwrap_or_else(|| TorrentRecord {
                info_hash: format!("added-{}", state.added),
                ..TorrentRecord::default()
            });
        if state
            .torrents
            .iter()
            .any(|existing| existing.info_hash == record.info_hash)
        {
            return Ok(());
        }
        record.download_dir = request.download_dir;
        if request.paused {
            record.state = TorrentState::Stopped;
        }
        state.torrents.push(record);
        Ok(())
    }
}
