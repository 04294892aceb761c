use std::fmt::Write as _;

use quiz_core::model::{OptionKey, Question};
use services::{QuizObserver, SessionSnapshot, TrailPoint};

/// Renders quiz events on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl QuizObserver for ConsoleObserver {
    fn on_question_ready(&self, question: &Question, position: u32, total: u32) {
        println!("{}", render_question(question, position, total));
    }

    fn on_answer_resolved(&self, selected: Option<&OptionKey>, correct: &OptionKey) {
        println!("{}", render_resolution(selected, correct));
    }

    fn on_analytics_changed(&self, snapshot: &SessionSnapshot) {
        println!("{}", render_analytics(snapshot));
    }

    fn on_session_finished(&self, snapshot: &SessionSnapshot) {
        println!("{}", render_results(snapshot));
    }

    fn on_session_dismissed(&self) {
        println!("\nQuiz closed.");
    }
}

pub fn render_question(question: &Question, position: u32, total: u32) -> String {
    let mut out = format!(
        "\nQuestion {position}/{total}  [{}]\n{}\n",
        question.difficulty(),
        question.prompt()
    );
    for (key, text) in question.options() {
        let _ = writeln!(out, "  {key}) {text}");
    }
    out.push_str("Answer with an option letter, s to skip, q to finish:");
    out
}

pub fn render_resolution(selected: Option<&OptionKey>, correct: &OptionKey) -> String {
    match selected {
        Some(key) if key == correct => "Correct!".to_owned(),
        Some(key) => format!("Wrong: you chose {key}, the answer was {correct}."),
        None => format!("Skipped. The answer was {correct}."),
    }
}

pub fn render_analytics(snapshot: &SessionSnapshot) -> String {
    format!(
        "Answered {} | Correct {} | Accuracy {}% | Ability {}",
        snapshot.total_questions, snapshot.score, snapshot.accuracy_percent, snapshot.ability
    )
}

pub fn render_results(snapshot: &SessionSnapshot) -> String {
    let mut out = format!(
        "\n=== {} results ===\nScore {}/{} ({}%), final ability {}\n",
        snapshot.subject,
        snapshot.score,
        snapshot.total_questions,
        snapshot.accuracy_percent,
        snapshot.ability
    );
    for (i, point) in snapshot.trail.iter().enumerate() {
        let _ = writeln!(out, "{}", render_trail_point(i + 1, point));
    }
    out
}

/// One row of the difficulty chart: bar length is the difficulty rank.
fn render_trail_point(n: usize, point: &TrailPoint) -> String {
    let bar = "#".repeat(usize::from(point.difficulty.rank()));
    let mark = if point.skipped {
        "skipped"
    } else if point.correct {
        "correct"
    } else {
        "wrong"
    };
    format!(
        "  Q{n:<3} {bar:<3} {:<6} {mark:<7} ability {}",
        point.difficulty, point.ability_after
    )
}

pub fn render_history_row(snapshot: &SessionSnapshot) -> String {
    let ended = snapshot
        .ended_at
        .map_or_else(|| "unfinished".to_owned(), |t| t.format("%Y-%m-%d %H:%M").to_string());
    format!(
        "{}  {:<12} {:>2}/{:<2} {:>3}%  ability {}  ({ended})",
        snapshot.started_at.format("%Y-%m-%d %H:%M"),
        snapshot.subject,
        snapshot.score,
        snapshot.total_questions,
        snapshot.accuracy_percent,
        snapshot.ability
    )
}
