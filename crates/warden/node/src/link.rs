//! Connectivity monitor

use tracing::{info, warn};
use warden_types::{LinkState, LinkStateChange};

/// Remembers the last observed link state and reports edges.
///
/// The caller decides the cadence; each [`poll`](Self::poll) compares the
/// live interface status with the remembered state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: LinkState,
}

impl ConnectivityMonitor {
    pub fn new(initial: LinkState) -> Self {
        Self { state: initial }
    }

    /// Last known state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Record the live status and report the edge it produced, if any.
    pub fn poll(&mut self, connected: bool) -> Option<LinkStateChange> {
        let current = LinkState::from_connected(connected);
        let change = LinkStateChange::between(self.state, current);
        self.state = current;

        match change {
            Some(LinkStateChange::Reconnected) => info!("Link reconnected"),
            Some(LinkStateChange::Disconnected) => warn!("Link lost, working offline"),
            None => {}
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_report_per_edge() {
        let mut monitor = ConnectivityMonitor::new(LinkState::Down);

        assert_eq!(monitor.poll(false), None);
        assert_eq!(monitor.poll(true), Some(LinkStateChange::Reconnected));
        assert_eq!(monitor.poll(true), None);
        assert_eq!(monitor.poll(true), None);
        assert_eq!(monitor.poll(false), Some(LinkStateChange::Disconnected));
        assert_eq!(monitor.poll(false), None);
        assert_eq!(monitor.poll(true), Some(LinkStateChange::Reconnected));
        assert_eq!(monitor.state(), LinkState::Up);
    }

    #[test]
    fn test_starting_up_reports_nothing_until_lost() {
        let mut monitor = ConnectivityMonitor::new(LinkState::Up);
        assert_eq!(monitor.poll(true), None);
        assert_eq!(monitor.poll(false), Some(LinkStateChange::Disconnected));
    }
}
