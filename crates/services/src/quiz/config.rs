use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use quiz_core::progression::{Progression, StepProgression, ThresholdProgression};
use quiz_core::selector::{BandSelector, NearestAbilitySelector, QuestionSelector};

//
// ─── POLICY ───────────────────────────────────────────────────────────────────
//

/// Selection and progression strategy, always chosen as a pair.
///
/// `Threshold` picks from the exact ability band (falling back upward, then
/// downward) and only raises ability after a randomized streak. `NearestAbility`
/// ranks questions by distance to a continuous ability that moves one step on
/// every answer, in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdaptivePolicy {
    #[default]
    Threshold,
    NearestAbility,
}

impl AdaptivePolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdaptivePolicy::Threshold => "threshold",
            AdaptivePolicy::NearestAbility => "nearest",
        }
    }

    #[must_use]
    pub fn selector(self) -> Box<dyn QuestionSelector> {
        match self {
            AdaptivePolicy::Threshold => Box::new(BandSelector),
            AdaptivePolicy::NearestAbility => Box::new(NearestAbilitySelector),
        }
    }

    #[must_use]
    pub fn progression(self) -> Box<dyn Progression> {
        match self {
            AdaptivePolicy::Threshold => Box::new(ThresholdProgression),
            AdaptivePolicy::NearestAbility => Box::new(StepProgression),
        }
    }
}

impl fmt::Display for AdaptivePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown policy \"{0}\" (expected threshold or nearest)")]
pub struct ParsePolicyError(pub String);

impl FromStr for AdaptivePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" => Ok(AdaptivePolicy::Threshold),
            "nearest" | "nearest-ability" => Ok(AdaptivePolicy::NearestAbility),
            _ => Err(ParsePolicyError(s.to_owned())),
        }
    }
}

//
// ─── CONFIG ───────────────────────────────────────────────────────────────────
//

/// Tunables for a quiz run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    max_questions: u32,
    answer_delay: Duration,
    policy: AdaptivePolicy,
    seed: Option<u64>,
}

impl QuizConfig {
    pub const DEFAULT_MAX_QUESTIONS: u32 = 10;
    pub const DEFAULT_ANSWER_DELAY: Duration = Duration::from_secs(2);

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Questions per session. Zero is raised to one.
    #[must_use]
    pub fn with_max_questions(mut self, max_questions: u32) -> Self {
        self.max_questions = max_questions.max(1);
        self
    }

    /// Pause between resolving an answer and showing the next question.
    #[must_use]
    pub fn with_answer_delay(mut self, delay: Duration) -> Self {
        self.answer_delay = delay;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AdaptivePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fix the random source for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn max_questions(&self) -> u32 {
        self.max_questions
    }

    #[must_use]
    pub fn answer_delay(&self) -> Duration {
        self.answer_delay
    }

    #[must_use]
    pub fn policy(&self) -> AdaptivePolicy {
        self.policy
    }

    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_questions: Self::DEFAULT_MAX_QUESTIONS,
            answer_delay: Self::DEFAULT_ANSWER_DELAY,
            policy: AdaptivePolicy::default(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_quiz() {
        let config = QuizConfig::default();
        assert_eq!(config.max_questions(), 10);
        assert_eq!(config.answer_delay(), Duration::from_secs(2));
        assert_eq!(config.policy(), AdaptivePolicy::Threshold);
        assert_eq!(config.seed(), None);
    }

    #[test]
    fn zero_questions_is_raised_to_one() {
        assert_eq!(QuizConfig::new().with_max_questions(0).max_questions(), 1);
    }

    #[test]
    fn policy_parses_both_spellings() {
        assert_eq!("Threshold".parse(), Ok(AdaptivePolicy::Threshold));
        assert_eq!("nearest".parse(), Ok(AdaptivePolicy::NearestAbility));
        assert_eq!(
            "nearest-ability".parse(),
            Ok(AdaptivePolicy::NearestAbility)
        );
        assert!("fastest".parse::<AdaptivePolicy>().is_err());
        assert_eq!(AdaptivePolicy::NearestAbility.to_string(), "nearest");
    }
}
