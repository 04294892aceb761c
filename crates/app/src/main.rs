use std::fmt;
use std::time::Duration;

use services::{AdaptivePolicy, QuizConfig, recent_sessions};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

mod console;
mod play;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidMaxQuestions { raw: String },
    InvalidDelay { raw: String },
    InvalidPolicy { raw: String },
    InvalidSeed { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidMaxQuestions { raw } => {
                write!(f, "invalid --max-questions value: {raw}")
            }
            ArgsError::InvalidDelay { raw } => write!(f, "invalid --delay-ms value: {raw}"),
            ArgsError::InvalidPolicy { raw } => {
                write!(f, "invalid --policy value (expected threshold or nearest): {raw}")
            }
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [play] [options]     Take a quiz (default)");
    eprintln!("  cargo run -p app -- subjects [--db <url>] List stored subjects");
    eprintln!("  cargo run -p app -- history  [options]    Show recent sessions");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3)");
    eprintln!("  --subject <name>          Subject to play (default: ask)");
    eprintln!("  --max-questions <n>       Questions per session (default: 10)");
    eprintln!("  --delay-ms <ms>           Pause before the next question (default: 2000)");
    eprintln!("  --policy <name>           threshold | nearest (default: threshold)");
    eprintln!("  --seed <n>                Fix the random source");
    eprintln!("  --limit <n>               Sessions to list for history (default: 10)");
    eprintln!("  --json                    Print history as JSON");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_SUBJECT, QUIZ_MAX_QUESTIONS, QUIZ_DELAY_MS, QUIZ_POLICY");
    eprintln!("  RUST_LOG controls log output (stderr)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Subjects,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "subjects" => Some(Self::Subjects),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    subject: Option<String>,
    config: QuizConfig,
    limit: u32,
    json: bool,
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut subject = std::env::var("QUIZ_SUBJECT")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let mut config = QuizConfig::new();
        if let Some(n) = env_parsed::<u32>("QUIZ_MAX_QUESTIONS") {
            config = config.with_max_questions(n);
        }
        if let Some(ms) = env_parsed::<u64>("QUIZ_DELAY_MS") {
            config = config.with_answer_delay(Duration::from_millis(ms));
        }
        if let Some(policy) = env_parsed::<AdaptivePolicy>("QUIZ_POLICY") {
            config = config.with_policy(policy);
        }
        let mut limit = 10;
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--subject" => {
                    subject = Some(require_value(args, "--subject")?);
                }
                "--max-questions" => {
                    let value = require_value(args, "--max-questions")?;
                    let n: u32 = value
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ArgsError::InvalidMaxQuestions { raw: value.clone() })?;
                    config = config.with_max_questions(n);
                }
                "--delay-ms" => {
                    let value = require_value(args, "--delay-ms")?;
                    let ms: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDelay { raw: value.clone() })?;
                    config = config.with_answer_delay(Duration::from_millis(ms));
                }
                "--policy" => {
                    let value = require_value(args, "--policy")?;
                    let policy: AdaptivePolicy = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPolicy { raw: value.clone() })?;
                    config = config.with_policy(policy);
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    let seed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    config = config.with_seed(Some(seed));
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--json" => json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            subject,
            config,
            limit,
            json,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its directory) so the pool can open it.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if argv.first().is_some_and(|a| !a.starts_with("--")) {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    tracing::debug!(db = %parsed.db_url, command = ?cmd, "storage opened");

    match cmd {
        Command::Play => play::play(&storage, parsed.config, parsed.subject).await,
        Command::Subjects => {
            let subjects = storage.questions.subjects().await?;
            if subjects.is_empty() {
                println!("No questions stored yet.");
            }
            for subject in subjects {
                let count = storage.questions.questions_by_subject(&subject).await?.len();
                println!("{subject} ({count} questions)");
            }
            Ok(())
        }
        Command::History => {
            let history = recent_sessions(storage.sessions.as_ref(), parsed.limit).await?;
            if parsed.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                println!("No sessions yet.");
            } else {
                for snapshot in &history {
                    println!("{}", console::render_history_row(snapshot));
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
