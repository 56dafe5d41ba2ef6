//! Liveness is the channel's derived belief that the server is currently
//! reachable, independent of the transport's raw connect/close state.
//!
//! The monitor is pure state: the channel actor feeds it keepalive sends,
//! inbound activity, and timer deadlines, and emits UI signals for the
//! transitions it reports. Degradation is advisory; it never forces the
//! transport closed.

use std::time::{Duration, Instant};

/// Liveness states. `Degraded` means a keepalive went unanswered within the
/// confirm timeout; any inbound envelope moves the monitor back to
/// `Confirmed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    Unconfirmed,
    Confirmed,
    Degraded,
    Closed,
}

/// Reported state changes the channel surfaces as signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessTransition {
    Degraded,
    Recovered,
}

/// Deployment-tunable liveness timing. The defaults follow the nominal
/// values: keepalives every 9s, answered within 1.5s, and a 10s startup
/// failsafe catching channels that never come up at all.
#[derive(Clone, Copy, Debug)]
pub struct LivenessConfig {
    pub keepalive_interval: Duration,
    pub confirm_timeout: Duration,
    pub startup_failsafe: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(9),
            confirm_timeout: Duration::from_millis(1500),
            startup_failsafe: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
pub struct LivenessMonitor {
    config: LivenessConfig,
    state: LivenessState,
    last_seen: Option<Instant>,
    ever_confirmed: bool,
}

impl LivenessMonitor {
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            state: LivenessState::Unconfirmed,
            last_seen: None,
            ever_confirmed: false,
        }
    }

    pub fn config(&self) -> LivenessConfig {
        self.config
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    /// Any parsed inbound envelope is proof of life, independent of kind.
    pub fn on_server_seen(&mut self, now: Instant) -> Option<LivenessTransition> {
        if self.state == LivenessState::Closed {
            return None;
        }
        self.last_seen = Some(now);
        self.ever_confirmed = true;
        match self.state {
            LivenessState::Degraded => {
                self.state = LivenessState::Confirmed;
                Some(LivenessTransition::Recovered)
            }
            LivenessState::Unconfirmed => {
                self.state = LivenessState::Confirmed;
                None
            }
            _ => None,
        }
    }

    /// Called when the confirm timeout armed at a keepalive send fires. The
    /// connection is degraded unless the server was seen after that send.
    pub fn confirm_deadline_passed(&mut self, sent_at: Instant) -> Option<LivenessTransition> {
        if matches!(self.state, LivenessState::Closed | LivenessState::Degraded) {
            return None;
        }
        let seen_since = self.last_seen.is_some_and(|seen| seen > sent_at);
        if seen_since {
            return None;
        }
        self.state = LivenessState::Degraded;
        Some(LivenessTransition::Degraded)
    }

    /// Called when the long startup failsafe fires: if the very first
    /// keepalive never completed, the channel likely never opened at all.
    pub fn startup_deadline_passed(&mut self) -> Option<LivenessTransition> {
        if self.ever_confirmed || matches!(self.state, LivenessState::Closed | LivenessState::Degraded)
        {
            return None;
        }
        self.state = LivenessState::Degraded;
        Some(LivenessTransition::Degraded)
    }

    pub fn close(&mut self) {
        self.state = LivenessState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> LivenessMonitor {
        LivenessMonitor::new(LivenessConfig::default())
    }

    #[test]
    fn confirms_on_first_inbound() {
        let mut m = monitor();
        assert_eq!(m.state(), LivenessState::Unconfirmed);
        assert_eq!(m.on_server_seen(Instant::now()), None);
        assert_eq!(m.state(), LivenessState::Confirmed);
    }

    #[test]
    fn degrades_when_keepalive_goes_unanswered() {
        let mut m = monitor();
        let sent_at = Instant::now();
        m.on_server_seen(sent_at - Duration::from_secs(1));
        assert_eq!(
            m.confirm_deadline_passed(sent_at),
            Some(LivenessTransition::Degraded)
        );
        assert_eq!(m.state(), LivenessState::Degraded);

        // A second overdue deadline does not re-signal.
        assert_eq!(m.confirm_deadline_passed(sent_at), None);
    }

    #[test]
    fn inbound_after_send_suppresses_degradation() {
        let mut m = monitor();
        let sent_at = Instant::now();
        m.on_server_seen(sent_at + Duration::from_millis(10));
        assert_eq!(m.confirm_deadline_passed(sent_at), None);
        assert_eq!(m.state(), LivenessState::Confirmed);
    }

    #[test]
    fn degraded_recovers_on_any_inbound() {
        let mut m = monitor();
        let sent_at = Instant::now();
        assert!(m.confirm_deadline_passed(sent_at).is_some());
        assert_eq!(
            m.on_server_seen(Instant::now()),
            Some(LivenessTransition::Recovered)
        );
        assert_eq!(m.state(), LivenessState::Confirmed);
    }

    #[test]
    fn startup_failsafe_only_fires_before_first_confirmation() {
        let mut m = monitor();
        assert_eq!(
            m.startup_deadline_passed(),
            Some(LivenessTransition::Degraded)
        );

        let mut m = monitor();
        m.on_server_seen(Instant::now());
        assert_eq!(m.startup_deadline_passed(), None);
    }

    #[test]
    fn closed_is_terminal() {
        let mut m = monitor();
        m.close();
        assert_eq!(m.on_server_seen(Instant::now()), None);
        assert_eq!(m.confirm_deadline_passed(Instant::now()), None);
        assert_eq!(m.startup_deadline_passed(), None);
        assert_eq!(m.state(), LivenessState::Closed);
    }
}
