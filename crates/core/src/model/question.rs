use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::{Difficulty, QuestionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("option key cannot be empty")]
    EmptyOptionKey,

    #[error("subject cannot be empty")]
    EmptySubject,

    #[error("prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least {min} options, got {got}")]
    TooFewOptions { min: usize, got: usize },

    #[error("option {0} has no text")]
    EmptyOptionText(OptionKey),

    #[error("option key {0} appears more than once")]
    DuplicateOption(OptionKey),

    #[error("correct option {0} is not one of the listed options")]
    UnknownCorrectOption(OptionKey),
}

//
// ─── OPTION KEY ───────────────────────────────────────────────────────────────
//

/// Label of a single answer option (`A`, `B`, ...).
///
/// Keys are trimmed and upper-cased so `" b"` and `"B"` name the same option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OptionKey(String);

impl OptionKey {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyOptionKey` if the key is blank.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, QuestionError> {
        let key = raw.as_ref().trim().to_uppercase();
        if key.is_empty() {
            return Err(QuestionError::EmptyOptionKey);
        }
        Ok(Self(key))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OptionKey {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OptionKey> for String {
    fn from(value: OptionKey) -> Self {
        value.0
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── QUESTION DRAFT ───────────────────────────────────────────────────────────
//

/// Unvalidated question as authored or imported from a question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub subject: String,
    pub difficulty: Difficulty,
    #[serde(alias = "text")]
    pub prompt: String,
    pub options: BTreeMap<String, String>,
    #[serde(alias = "correctAnswer")]
    pub correct: String,
}

impl QuestionDraft {
    pub const MIN_OPTIONS: usize = 2;

    /// Validate the draft and assign it an identifier.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when subject/prompt are blank, fewer than two
    /// options are given, an option is blank or repeated, or the correct key
    /// does not name one of the options.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        let subject = self.subject.trim().to_owned();
        if subject.is_empty() {
            return Err(QuestionError::EmptySubject);
        }
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.options.len() < Self::MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions {
                min: Self::MIN_OPTIONS,
                got: self.options.len(),
            });
        }

        let mut options = BTreeMap::new();
        for (raw_key, text) in self.options {
            let key = OptionKey::new(raw_key)?;
            let text = text.trim().to_owned();
            if text.is_empty() {
                return Err(QuestionError::EmptyOptionText(key));
            }
            if options.contains_key(&key) {
                return Err(QuestionError::DuplicateOption(key));
            }
            options.insert(key, text);
        }

        let correct = OptionKey::new(self.correct)?;
        if !options.contains_key(&correct) {
            return Err(QuestionError::UnknownCorrectOption(correct));
        }

        Ok(Question {
            id,
            subject,
            difficulty: self.difficulty,
            prompt,
            options,
            correct,
        })
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    subject: String,
    difficulty: Difficulty,
    prompt: String,
    options: BTreeMap<OptionKey, String>,
    correct: OptionKey,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Options in key order.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<OptionKey, String> {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> &OptionKey {
        &self.correct
    }

    /// A skipped answer (`None`) is never correct.
    #[must_use]
    pub fn is_correct(&self, selected: Option<&OptionKey>) -> bool {
        selected.is_some_and(|key| *key == self.correct)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            subject: "Math".into(),
            difficulty: Difficulty::Easy,
            prompt: "2 + 2 = ?".into(),
            options: BTreeMap::from([
                ("A".into(), "3".into()),
                ("b".into(), "4".into()),
                ("C".into(), "5".into()),
            ]),
            correct: "b".into(),
        }
    }

    #[test]
    fn valid_draft_normalizes_keys() {
        let q = draft().validate(QuestionId::new(1)).unwrap();
        assert_eq!(q.correct().as_str(), "B");
        let keys: Vec<&str> = q.options().keys().map(OptionKey::as_str).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }

    #[test]
    fn skip_is_never_correct() {
        let q = draft().validate(QuestionId::new(1)).unwrap();
        assert!(!q.is_correct(None));
        assert!(q.is_correct(Some(&OptionKey::new("B").unwrap())));
        assert!(!q.is_correct(Some(&OptionKey::new("A").unwrap())));
    }

    #[test]
    fn rejects_unknown_correct_option() {
        let mut d = draft();
        d.correct = "D".into();
        let err = d.validate(QuestionId::new(1)).unwrap_err();
        assert!(matches!(err, QuestionError::UnknownCorrectOption(_)));
    }

    #[test]
    fn rejects_blank_prompt_and_subject() {
        let mut d = draft();
        d.prompt = "   ".into();
        assert_eq!(
            d.validate(QuestionId::new(1)).unwrap_err(),
            QuestionError::EmptyPrompt
        );

        let mut d = draft();
        d.subject = String::new();
        assert_eq!(
            d.validate(QuestionId::new(1)).unwrap_err(),
            QuestionError::EmptySubject
        );
    }

    #[test]
    fn rejects_duplicate_keys_after_normalization() {
        let mut d = draft();
        d.options.insert("a".into(), "6".into());
        let err = d.validate(QuestionId::new(1)).unwrap_err();
        assert!(matches!(err, QuestionError::DuplicateOption(_)));
    }

    #[test]
    fn rejects_single_option() {
        let mut d = draft();
        d.options.retain(|key, _| key == "A");
        d.correct = "A".into();
        assert!(matches!(
            d.validate(QuestionId::new(1)),
            Err(QuestionError::TooFewOptions { min: 2, got: 1 })
        ));
    }

    #[test]
    fn draft_reads_bank_field_names() {
        let json = r#"{
            "subject": "Science",
            "difficulty": "medium",
            "text": "Water boils at?",
            "options": { "A": "90C", "B": "100C" },
            "correctAnswer": "B"
        }"#;
        let d: QuestionDraft = serde_json::from_str(json).unwrap();
        assert_eq!(d.difficulty, Difficulty::Medium);
        assert_eq!(d.prompt, "Water boils at?");
    }
}
