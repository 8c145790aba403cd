use std::time::{Duration, Instant};

/// Lifecycle of the backend's background job as seen from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
}

/// What the app should do after feeding a status poll into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Nothing,
    /// Run one fetch-normalize-render cycle: either the job just finished
    /// or it is mid-run and the visible list should grow live.
    Refresh,
}

/// Two-state machine over the status poll. Poll failures never reach
/// this type; a failed poll is "no information this tick".
#[derive(Debug)]
pub struct JobMonitor {
    state: JobState,
}

impl JobMonitor {
    pub fn new() -> JobMonitor {
        JobMonitor {
            state: JobState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    /// The user issued a trigger; the control is disabled until a poll
    /// reports the job idle again.
    pub fn on_trigger(&mut self) {
        self.state = JobState::Running;
    }

    pub fn on_poll(&mut self, running: bool) -> PollOutcome {
        let (next, outcome) = match (self.state, running) {
            // Just finished: pick up whatever the run produced.
            (JobState::Running, false) => (JobState::Idle, PollOutcome::Refresh),
            // Mid-run: refresh on every poll so the list grows live.
            (JobState::Running, true) => (JobState::Running, PollOutcome::Refresh),
            // A run started elsewhere (scheduler, another client).
            (JobState::Idle, true) => (JobState::Running, PollOutcome::Nothing),
            (JobState::Idle, false) => (JobState::Idle, PollOutcome::Nothing),
        };
        self.state = next;
        outcome
    }
}

/// Fixed-interval timer for the poll loops. `due` is edge-triggered:
/// it re-arms itself when it fires.
#[derive(Debug)]
pub struct Cadence {
    period: Duration,
    next: Instant,
}

impl Cadence {
    /// Due immediately, then every `period`.
    pub fn new(period: Duration) -> Cadence {
        Cadence {
            period,
            next: Instant::now(),
        }
    }

    pub fn due(&mut self, now: Instant) -> bool {
        if now >= self.next {
            self.next = now + self.period;
            true
        } else {
            false
        }
    }

    /// Pull the next firing closer (used for the early status probe right
    /// after a trigger). Never pushes it further out.
    pub fn hasten(&mut self, delay: Duration) {
        let candidate = Instant::now() + delay;
        if candidate < self.next {
            self.next = candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_transition_emits_exactly_one_refresh() {
        let mut monitor = JobMonitor::new();
        monitor.on_trigger();
        assert!(monitor.is_running());

        assert_eq!(monitor.on_poll(false), PollOutcome::Refresh);
        assert!(!monitor.is_running());
        assert_eq!(monitor.on_poll(false), PollOutcome::Nothing);
    }

    #[test]
    fn polls_while_running_refresh_each_time() {
        let mut monitor = JobMonitor::new();
        monitor.on_trigger();
        assert_eq!(monitor.on_poll(true), PollOutcome::Refresh);
        assert_eq!(monitor.on_poll(true), PollOutcome::Refresh);
        assert_eq!(monitor.on_poll(false), PollOutcome::Refresh);
        assert_eq!(monitor.on_poll(false), PollOutcome::Nothing);
    }

    #[test]
    fn externally_started_run_is_picked_up() {
        let mut monitor = JobMonitor::new();
        assert_eq!(monitor.on_poll(true), PollOutcome::Nothing);
        assert!(monitor.is_running());
        // ...and its completion still refreshes.
        assert_eq!(monitor.on_poll(false), PollOutcome::Refresh);
    }

    #[test]
    fn cadence_fires_then_rearms() {
        let mut cadence = Cadence::new(Duration::from_secs(4));
        let now = Instant::now();
        assert!(cadence.due(now));
        assert!(!cadence.due(now));
        assert!(!cadence.due(now + Duration::from_secs(3)));
        assert!(cadence.due(now + Duration::from_secs(4)));
    }

    #[test]
    fn hasten_only_moves_earlier() {
        let mut cadence = Cadence::new(Duration::from_secs(60));
        let now = Instant::now();
        assert!(cadence.due(now));
        cadence.hasten(Duration::from_secs(2));
        assert!(cadence.due(now + Duration::from_secs(3)));
        // A longer hasten than the pending deadline is ignored.
        cadence.hasten(Duration::from_secs(600));
        assert!(!cadence.due(now + Duration::from_secs(4)));
    }
}
