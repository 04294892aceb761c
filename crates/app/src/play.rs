use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use quiz_core::model::OptionKey;
use services::{QuizConfig, QuizController, Turn};
use storage::repository::Storage;

use crate::console::ConsoleObserver;

/// What a line of learner input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Answer(OptionKey),
    Skip,
    Finish,
    Unrecognized,
}

impl Action {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "" => Action::Unrecognized,
            "s" | "skip" => Action::Skip,
            "q" | "quit" | "finish" => Action::Finish,
            other => OptionKey::new(other).map_or(Action::Unrecognized, Action::Answer),
        }
    }
}

pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next line of input, or `None` once stdin is closed.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Ask for a subject from the stored catalog. `None` when the learner gives up.
pub async fn choose_subject(
    storage: &Storage,
    prompt: &mut Prompt,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let subjects = storage.questions.subjects().await?;
    if subjects.is_empty() {
        println!("No questions stored yet. Run the seed binary first.");
        return Ok(None);
    }

    println!("Subjects:");
    for (i, subject) in subjects.iter().enumerate() {
        println!("  {}) {subject}", i + 1);
    }
    loop {
        println!("Pick a subject by number or name (q to quit):");
        let Some(line) = prompt.next_line().await? else {
            return Ok(None);
        };
        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        if let Some(subject) = pick_subject(&subjects, choice) {
            return Ok(Some(subject.to_owned()));
        }
        println!("Unknown subject: {choice}");
    }
}

fn pick_subject<'a>(subjects: &'a [String], choice: &str) -> Option<&'a str> {
    if let Ok(n) = choice.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| subjects.get(i)).map(String::as_str);
    }
    subjects
        .iter()
        .find(|s| s.eq_ignore_ascii_case(choice))
        .map(String::as_str)
}

/// Run one quiz on the terminal.
pub async fn play(
    storage: &Storage,
    config: QuizConfig,
    subject: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut prompt = Prompt::stdin();
    let subject = match subject {
        Some(subject) => subject,
        None => match choose_subject(storage, &mut prompt).await? {
            Some(subject) => subject,
            None => return Ok(()),
        },
    };

    let mut quiz =
        QuizController::new(storage, config).with_observer(Arc::new(ConsoleObserver));
    let mut turn = quiz.start(&subject).await?;

    let result = drive(&mut quiz, &mut prompt, &mut turn).await;
    quiz.wait_for_pending_writes().await;
    result
}

async fn drive(
    quiz: &mut QuizController,
    prompt: &mut Prompt,
    turn: &mut Turn,
) -> Result<(), Box<dyn std::error::Error>> {
    while matches!(turn, Turn::Question(_)) {
        let Some(line) = prompt.next_line().await? else {
            quiz.finish(true).await?;
            return Ok(());
        };

        let selected = match Action::parse(&line) {
            Action::Answer(key) => Some(key),
            Action::Skip => None,
            Action::Finish => {
                quiz.finish(false).await?;
                return Ok(());
            }
            Action::Unrecognized => {
                println!("Type an option letter, s to skip, or q to finish.");
                continue;
            }
        };

        match quiz.answer(selected).await {
            Ok(outcome) => *turn = outcome.next,
            Err(err) if !err.is_user_visible() => {
                tracing::debug!(error = %err, "answer ignored");
                println!("That is not one of the options.");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_maps_to_actions() {
        assert_eq!(Action::parse(" b "), Action::Answer(OptionKey::new("B").unwrap()));
        assert_eq!(Action::parse("S"), Action::Skip);
        assert_eq!(Action::parse("quit"), Action::Finish);
        assert_eq!(Action::parse("   "), Action::Unrecognized);
    }

    #[test]
    fn subjects_pick_by_number_or_name() {
        let subjects = vec!["History".to_owned(), "Math".to_owned()];
        assert_eq!(pick_subject(&subjects, "2"), Some("Math"));
        assert_eq!(pick_subject(&subjects, "history"), Some("History"));
        assert_eq!(pick_subject(&subjects, "0"), None);
        assert_eq!(pick_subject(&subjects, "3"), None);
        assert_eq!(pick_subject(&subjects, "Art"), None);
    }
}
