use rand::{Rng, RngCore};

use crate::model::{Ability, Difficulty};

//
// ─── PROGRESS STATE ───────────────────────────────────────────────────────────
//

/// Ability, streak, and advancement threshold carried by a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    ability: Ability,
    streak: u32,
    threshold: u32,
}

impl Progress {
    /// Smallest and largest number of consecutive correct answers needed to advance.
    pub const THRESHOLD_RANGE: std::ops::RangeInclusive<u32> = 2..=3;

    /// Fresh state: easy band, no streak, newly drawn threshold.
    pub fn initial(rng: &mut dyn RngCore) -> Self {
        Self {
            ability: Ability::initial(),
            streak: 0,
            threshold: draw_threshold(rng),
        }
    }

    /// Rehydrate progress from persisted storage.
    #[must_use]
    pub fn from_persisted(ability: Ability, streak: u32, threshold: u32) -> Self {
        Self {
            ability,
            streak,
            threshold,
        }
    }

    #[must_use]
    pub fn ability(&self) -> Ability {
        self.ability
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Target difficulty implied by the current ability band.
    #[must_use]
    pub fn target(&self) -> Difficulty {
        self.ability.band()
    }
}

fn draw_threshold(rng: &mut dyn RngCore) -> u32 {
    rng.random_range(Progress::THRESHOLD_RANGE)
}

//
// ─── POLICIES ─────────────────────────────────────────────────────────────────
//

/// Ability update rule, invoked once per answered or skipped question.
pub trait Progression: Send + Sync {
    fn initial(&self, rng: &mut dyn RngCore) -> Progress {
        Progress::initial(rng)
    }

    fn apply(&self, progress: &mut Progress, correct: bool, rng: &mut dyn RngCore);
}

/// Streak-based advancement; ability never decreases within a session.
///
/// A correct answer extends the streak. Once the streak reaches the threshold
/// the ability rises one step, the streak resets, and a new threshold is drawn
/// from `{2, 3}`. Incorrect or skipped answers only reset the streak.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdProgression;

impl Progression for ThresholdProgression {
    fn apply(&self, progress: &mut Progress, correct: bool, rng: &mut dyn RngCore) {
        if !correct {
            progress.streak = 0;
            return;
        }

        progress.streak = progress.streak.saturating_add(1);
        if progress.streak >= progress.threshold {
            progress.ability = progress.ability.raised();
            progress.streak = 0;
            progress.threshold = draw_threshold(rng);
        }
    }
}

/// Legacy continuous rule: every answer moves ability one step.
///
/// Correct answers raise it, incorrect or skipped answers lower it. The streak
/// is tracked for reporting only and the threshold is left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepProgression;

impl Progression for StepProgression {
    fn apply(&self, progress: &mut Progress, correct: bool, _rng: &mut dyn RngCore) {
        if correct {
            progress.ability = progress.ability.raised();
            progress.streak = progress.streak.saturating_add(1);
        } else {
            progress.ability = progress.ability.lowered();
            progress.streak = 0;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
