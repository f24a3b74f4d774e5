//! Timed breathing exercise. A session alternates "breath in" and "breath out" phases until the
//! total duration is used up. Sound and animation are left to whoever receives the phases.

use std::{fmt::Display, time::Duration};

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::clock::Clock;

pub const MINUTES_RANGE: (u64, u64) = (1, 120);
pub const BREATH_RANGE: (u64, u64) = (1, 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathPhase {
    In,
    Out,
}

impl Display for BreathPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreathPhase::In => write!(f, "Breath in"),
            BreathPhase::Out => write!(f, "Breath out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreathingPlan {
    total: Duration,
    breath_in: Duration,
    breath_out: Duration,
}

impl Default for BreathingPlan {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(10 * 60),
            breath_in: Duration::from_secs(5),
            breath_out: Duration::from_secs(5),
        }
    }
}

impl BreathingPlan {
    /// Builds a plan from user input: whole minutes and whole seconds per phase.
    pub fn new(minutes: u64, breath_in_secs: u64, breath_out_secs: u64) -> Result<Self> {
        let (min_minutes, max_minutes) = MINUTES_RANGE;
        if !(min_minutes..=max_minutes).contains(&minutes) {
            bail!("Meditation must last between {min_minutes} and {max_minutes} minutes, got {minutes}");
        }
        let (min_breath, max_breath) = BREATH_RANGE;
        for (name, secs) in [("breath in", breath_in_secs), ("breath out", breath_out_secs)] {
            if !(min_breath..=max_breath).contains(&secs) {
                bail!("The {name} phase must last between {min_breath} and {max_breath} seconds, got {secs}");
            }
        }
        Ok(Self {
            total: Duration::from_secs(minutes * 60),
            breath_in: Duration::from_secs(breath_in_secs),
            breath_out: Duration::from_secs(breath_out_secs),
        })
    }

    /// Bypasses the user-facing limits, for short sessions in tests.
    #[cfg(test)]
    pub fn from_durations(total: Duration, breath_in: Duration, breath_out: Duration) -> Self {
        Self {
            total,
            breath_in,
            breath_out,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// Offsets from the session start at which each phase begins. Phases that would start at or
    /// after the end of the session are left out.
    pub fn schedule(&self) -> Vec<(Duration, BreathPhase)> {
        let cycle = self.breath_in + self.breath_out;
        let mut phases = Vec::new();
        let mut offset = Duration::ZERO;
        while offset < self.total {
            phases.push((offset, BreathPhase::In));
            let out = offset + self.breath_in;
            if out < self.total {
                phases.push((out, BreathPhase::Out));
            }
            offset += cycle;
        }
        phases
    }
}

pub struct BreathingSession {
    plan: BreathingPlan,
    clock: Box<dyn Clock>,
}

impl BreathingSession {
    pub fn new(plan: BreathingPlan, clock: Box<dyn Clock>) -> Self {
        Self { plan, clock }
    }

    /// Waits for each phase and hands it to `on_phase`. Returns whether the session ran to the
    /// end (`false` when cancelled).
    pub async fn run(
        &self,
        shutdown: CancellationToken,
        mut on_phase: impl FnMut(BreathPhase),
    ) -> bool {
        let start = self.clock.instant();
        info!("Starting meditation for {:?}", self.plan.total);
        for (offset, phase) in self.plan.schedule() {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Meditation cancelled");
                    return false
                }
                _ = self.clock.sleep_until(start + offset) => ()
            }
            debug!("{phase} at {offset:?}");
            on_phase(phase);
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Meditation cancelled");
                false
            }
            _ = self.clock.sleep_until(start + self.plan.total) => {
                info!("Meditation finished");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{
        meditation::{BreathPhase, BreathingPlan, BreathingSession},
        utils::clock::DefaultClock,
    };

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_plan_limits() {
        assert!(BreathingPlan::new(10, 5, 5).is_ok());
        assert!(BreathingPlan::new(0, 5, 5).is_err());
        assert!(BreathingPlan::new(121, 5, 5).is_err());
        assert!(BreathingPlan::new(10, 0, 5).is_err());
        assert!(BreathingPlan::new(10, 5, 61).is_err());
        assert_eq!(BreathingPlan::default(), BreathingPlan::new(10, 5, 5).unwrap());
    }

    #[test]
    fn test_schedule() {
        let plan = BreathingPlan::from_durations(secs(20), secs(5), secs(5));
        assert_eq!(
            plan.schedule(),
            vec![
                (secs(0), BreathPhase::In),
                (secs(5), BreathPhase::Out),
                (secs(10), BreathPhase::In),
                (secs(15), BreathPhase::Out),
            ]
        );
    }

    #[test]
    fn test_schedule_uneven_phases() {
        let plan = BreathingPlan::from_durations(secs(9), secs(4), secs(2));
        assert_eq!(
            plan.schedule(),
            vec![
                (secs(0), BreathPhase::In),
                (secs(4), BreathPhase::Out),
                (secs(6), BreathPhase::In),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_runs_phases_on_time() {
        let plan = BreathingPlan::from_durations(secs(20), secs(5), secs(5));
        let session = BreathingSession::new(plan, Box::new(DefaultClock));
        let start = Instant::now();
        let seen = RefCell::new(Vec::new());

        let finished = session
            .run(CancellationToken::new(), |phase| {
                seen.borrow_mut().push((start.elapsed().as_secs(), phase))
            })
            .await;

        assert!(finished);
        assert_eq!(start.elapsed().as_secs(), 20);
        assert_eq!(
            seen.into_inner(),
            vec![
                (0, BreathPhase::In),
                (5, BreathPhase::Out),
                (10, BreathPhase::In),
                (15, BreathPhase::Out),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_cancelled() {
        let plan = BreathingPlan::default();
        let session = BreathingSession::new(plan, Box::new(DefaultClock));
        let shutdown = CancellationToken::new();
        let canceller = shutdown.clone();
        let mut phases = 0;

        let (finished, _) = tokio::join!(session.run(shutdown, |_| phases += 1), async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            canceller.cancel();
        });

        assert!(!finished);
        assert_eq!(phases, 3);
    }
}
