//! Device uptime

use tokio::time::Instant;
use warden_types::UptimeMillis;

/// Milliseconds since the node booted.
///
/// Attendance events are stamped with this counter. There is no wall clock
/// on the node; the server stores the counter as reported.
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    boot: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    pub fn now(&self) -> UptimeMillis {
        UptimeMillis(self.boot.elapsed().as_millis() as u64)
    }
}
