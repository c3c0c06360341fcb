//! Copy-tool output classification and milestone throttling.

use once_cell::sync::Lazy;
use regex::Regex;

/// Stats captions printed by the copy tool that carry no operator value.
pub const NOISE_CAPTIONS: &[&str] = &[
    "sending incremental file list",
    "Number of files:",
    "Number of created files:",
    "Number of deleted files:",
    "Total file size:",
    "Total transferred file size:",
    "Literal data:",
    "Matched data:",
    "File list size:",
    "File list generation time",
    "File list transfer time:",
    "Total bytes sent:",
    "Total bytes received:",
    "total size is",
];

const FILES_TRANSFERRED_CAPTION: &str = "Number of regular files transferred:";

static PROGRESS_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^(?:\d{1,3}(?:,\d{3})+|\d+)\s+(\d{1,3})%\s+\d+(?:\.\d+)?[kMG]B/s\s+(?:[0-8]?\d|9[0-8]):[0-5]\d:[0-5]\d$",
    )
    .ok()
});

/// What a single trimmed output line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A stats caption that should be dropped.
    Noise,
    /// A progress line carrying the percentage of the current file.
    Progress(u8),
    /// The regular-files-transferred stats line.
    FilesTransferred(u64),
    /// Anything else, passed through to the log verbatim.
    Message,
}

/// Classify one line of copy-tool output.
///
/// Noise captions are only meaningful on stdout; callers decide whether to
/// honour [`LineKind::Noise`] for stderr lines.
#[must_use]
pub fn classify(line: &str) -> LineKind {
    let line = line.trim();
    if NOISE_CAPTIONS.iter().any(|caption| line.contains(caption)) {
        return LineKind::Noise;
    }
    if let Some(captures) = PROGRESS_LINE.as_ref().and_then(|re| re.captures(line))
        && let Some(percent) = captures.get(1).and_then(|m| m.as_str().parse::<u8>().ok())
    {
        return LineKind::Progress(percent);
    }
    if let Some(count) = parse_files_transferred(line) {
        return LineKind::FilesTransferred(count);
    }
    LineKind::Message
}

fn parse_files_transferred(line: &str) -> Option<u64> {
    let (_, rest) = line.split_once(FILES_TRANSFERRED_CAPTION)?;
    let digits: String = rest
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Tracks which progress milestones have already been surfaced for one task.
///
/// A percentage reaches a milestone when it lies within the tolerance of it.
/// When several milestones qualify the nearest wins, ties going to the lower
/// one. Milestones at or below the highest one already emitted never fire
/// again, so emitted values are strictly increasing for the life of a task.
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    milestones: Vec<u8>,
    tolerance: u8,
    highest: Option<u8>,
    emitted: Vec<u8>,
}

impl MilestoneTracker {
    /// Tracker over `milestones` (any order) with the given tolerance.
    #[must_use]
    pub fn new(milestones: &[u8], tolerance: u8) -> Self {
        let mut milestones = milestones.to_vec();
        milestones.sort_unstable();
        milestones.dedup();
        Self {
            milestones,
            tolerance,
            highest: None,
            emitted: Vec::new(),
        }
    }

    /// Feed one observed percentage; returns the milestone to log, if any.
    pub fn observe(&mut self, percent: u8) -> Option<u8> {
        let tolerance = self.tolerance;
        let floor = self.highest;
        let milestone = self
            .milestones
            .iter()
            .copied()
            .filter(|milestone| floor.is_none_or(|highest| *milestone > highest))
            .filter(|milestone| percent.abs_diff(*milestone) <= tolerance)
            .min_by_key(|milestone| (percent.abs_diff(*milestone), *milestone))?;
        self.highest = Some(milestone);
        self.emitted.push(milestone);
        Some(milestone)
    }

    /// Milestones emitted so far, in emission order.
    #[must_use]
    pub fn emitted(&self) -> &[u8] {
        &self.emitted
    }
}
