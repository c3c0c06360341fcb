//! Process-wide span carrying the run mode and build identifier.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the process span entered for the lifetime of the guard.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the process span tagged with `mode` (`service`, `once`, `dry-run`).
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "seedferry",
            mode = %mode,
            build_sha = %build_sha()
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

impl std::fmt::Debug for GlobalContextGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalContextGuard").finish_non_exhaustive()
    }
}
