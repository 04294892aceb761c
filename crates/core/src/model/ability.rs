use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Difficulty;

/// Estimated learner skill on the continuous `[1.0, 3.0]` scale.
///
/// The value is banded into a target difficulty:
/// - `[1.0, 1.5)` easy
/// - `[1.5, 2.5)` medium
/// - `[2.5, 3.0]` hard
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Ability(f64);

impl Ability {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 3.0;
    /// Fixed adjustment applied on every ability change.
    pub const STEP: f64 = 0.5;

    const MEDIUM_FLOOR: f64 = 1.5;
    const HARD_FLOOR: f64 = 2.5;

    /// Builds an ability, clamping into `[MIN, MAX]`. NaN maps to `MIN`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    /// Starting point of every session.
    #[must_use]
    pub fn initial() -> Self {
        Self(Self::MIN)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn band(self) -> Difficulty {
        if self.0 < Self::MEDIUM_FLOOR {
            Difficulty::Easy
        } else if self.0 < Self::HARD_FLOOR {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }

    #[must_use]
    pub fn raised(self) -> Self {
        Self::new(self.0 + Self::STEP)
    }

    #[must_use]
    pub fn lowered(self) -> Self {
        Self::new(self.0 - Self::STEP)
    }

    /// Distance between this ability and a difficulty rank.
    #[must_use]
    pub fn distance_to(self, difficulty: Difficulty) -> f64 {
        (f64::from(difficulty.rank()) - self.0).abs()
    }
}

impl Default for Ability {
    fn default() -> Self {
        Self::initial()
    }
}

impl From<f64> for Ability {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Ability> for f64 {
    fn from(value: Ability) -> Self {
        value.0
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
