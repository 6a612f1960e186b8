//! Phase timing for test runs
//!
//! A run moves through a fixed sequence of phases (start gate, fetch,
//! probe, persist). `PhaseTimer` records how long each one took so the
//! orchestrator can report where the wall-clock time went.

use std::fmt;
use std::time::{Duration, Instant};

/// Duration spent in one named phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    pub name: &'static str,
    pub duration: Duration,
}

/// Records consecutive phases of a single run
#[derive(Debug)]
pub struct PhaseTimer {
    started: Instant,
    mark: Instant,
    phases: Vec<Phase>,
}

impl PhaseTimer {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            mark: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `name` and begin the next one
    pub fn lap(&mut self, name: &'static str) -> Duration {
        let now = Instant::now();
        let duration = now - self.mark;
        self.mark = now;
        self.phases.push(Phase { name, duration });
        duration
    }

    /// Stop timing; returns every recorded phase and the total
    pub fn finish(self) -> PhaseTimings {
        PhaseTimings {
            phases: self.phases,
            total: self.started.elapsed(),
        }
    }
}

/// Timings of a finished run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub phases: Vec<Phase>,
    pub total: Duration,
}

impl PhaseTimings {
    pub fn get(&self, name: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|phase| phase.name == name)
            .map(|phase| phase.duration)
    }
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for phase in &self.phases {
            write!(f, "{}={}ms ", phase.name, phase.duration.as_millis())?;
        }
        write!(f, "total={}ms", self.total.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_phases_are_consecutive() {
        let mut timer = PhaseTimer::start();
        sleep(Duration::from_millis(10));
        timer.lap("fetch");
        sleep(Duration::from_millis(20));
        timer.lap("probe");

        let timings = timer.finish();
        assert_eq!(timings.phases.len(), 2);
        assert!(timings.get("fetch").unwrap() >= Duration::from_millis(10));
        assert!(timings.get("probe").unwrap() >= Duration::from_millis(20));
        assert!(timings.total >= Duration::from_millis(30));
        assert_eq!(timings.get("persist"), None);
    }

    #[test]
    fn test_display() {
        let timings = PhaseTimings {
            phases: vec![Phase {
                name: "probe",
                duration: Duration::from_millis(1500),
            }],
            total: Duration::from_millis(1600),
        };
        assert_eq!(timings.to_string(), "probe=1500ms total=1600ms");
    }
}
