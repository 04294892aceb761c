use std::fmt;
use std::path::PathBuf;

use storage::bank::{self, SeedOutcome};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    bank: Option<PathBuf>,
    remove_last: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidBank { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidBank { raw } => write!(f, "invalid --bank value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .unwrap_or_else(|_| "sqlite://quiz.sqlite3?mode=rwc".into());
        let mut bank = std::env::var("QUIZ_BANK")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let mut remove_last = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--bank" => {
                    let value = require_value(&mut args, "--bank")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidBank { raw: value });
                    }
                    bank = Some(PathBuf::from(value));
                }
                "--remove-last" => remove_last = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            bank,
            remove_last,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3?mode=rwc)");
    eprintln!("  --bank <path>             JSON question bank (default: bundled sample bank)");
    eprintln!("  --remove-last             Delete the question with the highest id and exit");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_BANK");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    if args.remove_last {
        match bank::remove_last_question(storage.questions.as_ref()).await? {
            Some(id) => println!("Removed question {id} from {}", args.db_url),
            None => println!("No questions stored in {}", args.db_url),
        }
        return Ok(());
    }

    let json = match &args.bank {
        Some(path) => std::fs::read_to_string(path)?,
        None => bank::SAMPLE_BANK.to_owned(),
    };
    let questions = bank::parse_bank(&json)?;

    match bank::seed_questions(storage.questions.as_ref(), &questions).await? {
        SeedOutcome::Seeded { upserted } => {
            println!("Seeded {upserted} questions into {}", args.db_url);
        }
        SeedOutcome::UpToDate { stored } => {
            println!(
                "{} already holds {stored} questions; nothing to seed",
                args.db_url
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
