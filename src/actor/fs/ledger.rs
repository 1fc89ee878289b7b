use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// Per-path record of the last reload notification.
///
/// Gates notification frequency only: editors and OSes emit several raw
/// events per logical save, and only the first one inside the window
/// becomes a RELOAD.
pub(super) struct ChangeLedger {
    window: Duration,
    last_notified: FxHashMap<String, Instant>,
}

impl ChangeLedger {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            last_notified: FxHashMap::default(),
        }
    }

    /// Returns `false` (and records nothing) when `path` was notified at most
    /// `window` ago; otherwise records `now` and returns `true`.
    pub(super) fn should_notify(&mut self, path: &str, now: Instant) -> bool {
        if let Some(&last) = self.last_notified.get(path)
            && now.saturating_duration_since(last) <= self.window
        {
            return false;
        }

        self.last_notified.insert(path.to_string(), now);
        true
    }
}
