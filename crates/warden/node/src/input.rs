//! Input conditioning for the reader and the status button

use std::time::Duration;
use tokio::time::Instant;

/// Ignores the reader for a while after each accepted scan.
#[derive(Debug, Clone)]
pub struct ScanGuard {
    hold: Duration,
    last_scan: Option<Instant>,
}

impl ScanGuard {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            last_scan: None,
        }
    }

    /// Whether the reader may be polled at `now`.
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last_scan {
            Some(last) => now.duration_since(last) > self.hold,
            None => true,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_scan = Some(now);
    }
}

/// Debounced push button. Reports each press once, after the level has
/// been stable for the debounce period.
#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    debounce: Duration,
    raw: bool,
    stable: bool,
    changed_at: Option<Instant>,
}

impl ButtonDebouncer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            raw: false,
            stable: false,
            changed_at: None,
        }
    }

    /// Feed one raw sample. Returns `true` on a debounced press.
    pub fn update(&mut self, pressed: bool, now: Instant) -> bool {
        if pressed != self.raw {
            self.raw = pressed;
            self.changed_at = Some(now);
        }

        let settled = self
            .changed_at
            .map_or(true, |at| now.duration_since(at) >= self.debounce);
        if settled && self.raw != self.stable {
            self.stable = self.raw;
            return self.stable;
        }
        false
    }
}
