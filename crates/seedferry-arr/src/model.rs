//! Queue payloads and missing-path detection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static MISSING_PATH: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"path does not exist or is not accessible by (\w+): (.*)\. Ensure the path exists")
        .ok()
});

/// One page of `GET /api/v3/queue`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueuePage {
    /// Queue entries.
    pub records: Vec<QueueRecord>,
}

/// One queue entry; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueRecord {
    /// Release title.
    pub title: String,
    /// Download status (`completed`, `warning`, ...).
    pub status: String,
    /// Output path as seen by the application.
    pub output_path: Option<String>,
    /// Import diagnostics.
    pub status_messages: Vec<StatusMessage>,
}

/// Grouped diagnostic messages for a queue entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusMessage {
    /// Group title, usually a file name.
    pub title: String,
    /// Individual messages.
    pub messages: Vec<String>,
}

impl QueueRecord {
    /// Missing-path reports found in this entry's messages.
    pub fn missing_paths(&self) -> impl Iterator<Item = MissingPath> + '_ {
        self.status_messages
            .iter()
            .flat_map(|group| group.messages.iter())
            .filter_map(|message| MissingPath::detect(message))
    }
}

/// A payload path an application could not reach.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissingPath {
    /// Reporting application, lower-cased.
    pub program: String,
    /// Path as reported.
    pub path: String,
}

impl MissingPath {
    /// Parse a "path does not exist or is not accessible" diagnostic.
    #[must_use]
    pub fn detect(message: &str) -> Option<Self> {
        let captures = MISSING_PATH.as_ref()?.captures(message)?;
        let program = captures.get(1)?.as_str().to_lowercase();
        let path = captures.get(2)?.as_str().trim().to_string();
        if path.is_empty() {
            return None;
        }
        Some(Self { program, path })
    }
}
