use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a difficulty label.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("unknown difficulty label: {0}")]
    UnknownLabel(String),
    #[error("difficulty rank out of range: {0}")]
    InvalidRank(u8),
}

/// The three discrete difficulty labels a question can carry.
///
/// Ranks are `easy=1`, `medium=2`, `hard=3`; [`Difficulty::ORDER`] lists the
/// labels in ascending rank and drives the stepwise fallback search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ORDER: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Inverse of [`Difficulty::rank`].
    ///
    /// # Errors
    ///
    /// Returns `DifficultyError::InvalidRank` for anything outside `1..=3`.
    pub fn from_rank(rank: u8) -> Result<Self, DifficultyError> {
        match rank {
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Medium),
            3 => Ok(Difficulty::Hard),
            other => Err(DifficultyError::InvalidRank(other)),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    fn position(self) -> usize {
        usize::from(self.rank() - 1)
    }

    /// Strictly harder labels, nearest first.
    pub fn harder(self) -> impl Iterator<Item = Difficulty> {
        Self::ORDER.into_iter().skip(self.position() + 1)
    }

    /// Strictly easier labels, nearest first.
    pub fn easier(self) -> impl Iterator<Item = Difficulty> {
        Self::ORDER.into_iter().take(self.position()).rev()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(DifficultyError::UnknownLabel(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_ordered_and_injective() {
        let ranks: Vec<u8> = Difficulty::ORDER.iter().map(|d| d.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        for d in Difficulty::ORDER {
            assert_eq!(Difficulty::from_rank(d.rank()).unwrap(), d);
        }
        assert!(matches!(
            Difficulty::from_rank(4),
            Err(DifficultyError::InvalidRank(4))
        ));
    }

    #[test]
    fn harder_scans_upward_and_easier_scans_downward() {
        assert_eq!(
            Difficulty::Easy.harder().collect::<Vec<_>>(),
            vec![Difficulty::Medium, Difficulty::Hard]
        );
        assert_eq!(Difficulty::Easy.easier().count(), 0);
        assert_eq!(
            Difficulty::Hard.easier().collect::<Vec<_>>(),
            vec![Difficulty::Medium, Difficulty::Easy]
        );
        assert_eq!(Difficulty::Hard.harder().count(), 0);
        assert_eq!(
            Difficulty::Medium.harder().collect::<Vec<_>>(),
            vec![Difficulty::Hard]
        );
        assert_eq!(
            Difficulty::Medium.easier().collect::<Vec<_>>(),
            vec![Difficulty::Easy]
        );
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("Medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_labels() {
        let json = serde_json::to_string(&Difficulty::Easy).unwrap();
        assert_eq!(json, "\"easy\"");
    }
}
