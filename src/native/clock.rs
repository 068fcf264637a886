use std::time::{Duration, Instant};

/// Position inside the loaded track: time banked before the last pause plus
/// the run since the last resume.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Clock {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl Clock {
    /// A stopped clock reading `at`.
    pub(super) fn at(at: Duration) -> Self {
        Self {
            started_at: None,
            accumulated: at,
        }
    }

    pub(super) fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    pub(super) fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub(super) fn resume(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    pub(super) fn pause(&mut self) {
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
    }
}
