//! Input scheduler: keep, replay, or freshly reseed the kernel inputs.
//!
//! After an error-bearing iteration the inputs are rebuilt from the *current*
//! seed, so an immediate retry sees the same vector and flaky corruption can
//! be told apart from systematic corruption. Every `change_rate` iterations
//! the seed is dropped and re-derived from the iteration counter. The cadence
//! check runs after the error check and wins when both apply.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seed held by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedState {
    /// Derive a fresh seed from the iteration counter at next use.
    Derive,
    /// Replay this seed deterministically.
    Replay(u64),
}

impl SeedState {
    /// Raw value used by the log format, where `-1` means [`Self::Derive`].
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        if raw == -1 {
            Self::Derive
        } else {
            Self::Replay(raw as u64)
        }
    }

    #[must_use]
    pub const fn to_raw(self) -> i64 {
        match self {
            Self::Derive => -1,
            Self::Replay(seed) => seed as i64,
        }
    }
}

/// What to do with the inputs before the next iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleDecision {
    /// Inputs and goldens stay as they are.
    Keep,
    /// Rebuild inputs and goldens from the current seed.
    Replay,
    /// Drop the seed, derive a new one, rebuild inputs and goldens.
    Fresh,
}

#[derive(Debug, Clone)]
pub struct InputScheduler {
    seed: SeedState,
    change_rate: u64,
    fresh_count: u64,
    replay_count: u64,
}

impl InputScheduler {
    /// `change_rate` must be non-zero; see [`crate::EngineConfig::validate`].
    #[must_use]
    pub fn new(change_rate: u64) -> Self {
        Self {
            seed: SeedState::Derive,
            change_rate: change_rate.max(1),
            fresh_count: 0,
            replay_count: 0,
        }
    }

    /// Start from a specific seed instead of deriving one.
    #[must_use]
    pub fn with_seed(mut self, seed: SeedState) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn seed(&self) -> SeedState {
        self.seed
    }

    #[must_use]
    pub fn change_rate(&self) -> u64 {
        self.change_rate
    }

    /// Whether `iteration` falls on the reseed cadence.
    #[must_use]
    pub fn is_cadence(&self, iteration: u64) -> bool {
        iteration % self.change_rate == 0
    }

    /// Decide what the iteration that just finished requires.
    #[must_use]
    pub fn decide(&self, local_errors: u64, iteration: u64) -> ScheduleDecision {
        let mut decision = ScheduleDecision::Keep;
        if local_errors > 0 {
            decision = ScheduleDecision::Replay;
        }
        if self.is_cadence(iteration) {
            decision = ScheduleDecision::Fresh;
        }
        decision
    }

    /// Seed to regenerate with for `decision`, made at the end of `iteration`.
    ///
    /// A fresh seed is `iteration` itself, not the iteration that applies it.
    ///
    /// Returns `None` for [`ScheduleDecision::Keep`].
    pub fn resolve(&mut self, decision: ScheduleDecision, iteration: u64) -> Option<u64> {
        match decision {
            ScheduleDecision::Keep => None,
            ScheduleDecision::Replay => {
                self.replay_count = self.replay_count.saturating_add(1);
                Some(self.seed_for(iteration))
            }
            ScheduleDecision::Fresh => {
                self.fresh_count = self.fresh_count.saturating_add(1);
                self.seed = SeedState::Derive;
                Some(self.seed_for(iteration))
            }
        }
    }

    /// Current seed, deriving and latching one from `iteration` if none is held.
    pub fn seed_for(&mut self, iteration: u64) -> u64 {
        match self.seed {
            SeedState::Replay(seed) => seed,
            SeedState::Derive => {
                debug!(target: "seubench.scheduler", iteration, "deriving fresh seed");
                self.seed = SeedState::Replay(iteration);
                iteration
            }
        }
    }

    #[must_use]
    pub fn fresh_count(&self) -> u64 {
        self.fresh_count
    }

    #[must_use]
    pub fn replay_count(&self) -> u64 {
        self.replay_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_selects_fresh_even_after_errors() {
        let scheduler = InputScheduler::new(4);
        assert_eq!(scheduler.decide(0, 8), ScheduleDecision::Fresh);
        assert_eq!(scheduler.decide(3, 8), ScheduleDecision::Fresh);
        assert_eq!(scheduler.decide(3, 9), ScheduleDecision::Replay);
        assert_eq!(scheduler.decide(0, 9), ScheduleDecision::Keep);
    }

    #[test]
    fn replay_reuses_the_current_seed() {
        let mut scheduler = InputScheduler::new(100).with_seed(SeedState::Replay(42));
        assert_eq!(scheduler.resolve(ScheduleDecision::Replay, 7), Some(42));
        assert_eq!(scheduler.resolve(ScheduleDecision::Replay, 8), Some(42));
        assert_eq!(scheduler.seed(), SeedState::Replay(42));
        assert_eq!(scheduler.replay_count(), 2);
    }

    #[test]
    fn fresh_derives_from_iteration() {
        let mut scheduler = InputScheduler::new(10).with_seed(SeedState::Replay(42));
        assert_eq!(scheduler.resolve(ScheduleDecision::Fresh, 31), Some(31));
        assert_eq!(scheduler.seed(), SeedState::Replay(31));
        assert_eq!(scheduler.resolve(ScheduleDecision::Keep, 32), None);
    }

    #[test]
    fn replay_from_derive_state_latches_a_seed() {
        let mut scheduler = InputScheduler::new(10);
        assert_eq!(scheduler.resolve(ScheduleDecision::Replay, 5), Some(5));
        assert_eq!(scheduler.resolve(ScheduleDecision::Replay, 6), Some(5));
    }

    #[test]
    fn raw_sentinel_round_trips() {
        assert_eq!(SeedState::from_raw(-1), SeedState::Derive);
        assert_eq!(SeedState::from_raw(42), SeedState::Replay(42));
        assert_eq!(SeedState::Derive.to_raw(), -1);
        assert_eq!(SeedState::Replay(7).to_raw(), 7);
    }

    #[test]
    fn zero_change_rate_is_clamped() {
        let scheduler = InputScheduler::new(0);
        assert_eq!(scheduler.change_rate(), 1);
        assert!(scheduler.is_cadence(3));
    }
}
