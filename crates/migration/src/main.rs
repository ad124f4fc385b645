use std::path::Path;

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/transactions.db?mode=rwc";
const USAGE: &str = "Usage: cargo run -p migration -- [up [N]|down [N]|fresh|status]";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Up(Option<u32>),
    Down(Option<u32>),
    Fresh,
    Status,
}

fn parse_command(args: &[String]) -> Option<Command> {
    let steps = match args.get(1) {
        Some(raw) => Some(raw.parse::<u32>().ok()?),
        None => None,
    };
    if args.len() > 2 {
        return None;
    }
    match (args.first().map(String::as_str).unwrap_or("up"), steps) {
        ("up", steps) => Some(Command::Up(steps)),
        ("down", steps) => Some(Command::Down(steps)),
        ("fresh", None) => Some(Command::Fresh),
        ("status", None) => Some(Command::Status),
        _ => None,
    }
}

/// File backing a `sqlite:` url, if any. In-memory urls have none.
fn sqlite_file(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cmd) = parse_command(&args) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let db_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    // sqlite creates the file with mode=rwc, not its directory
    if let Some(parent) = sqlite_file(&db_url).and_then(Path::parent)
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::connect(&db_url).await?;

    match cmd {
        Command::Up(steps) => migration::Migrator::up(&db, steps).await?,
        Command::Down(steps) => migration::Migrator::down(&db, steps).await?,
        Command::Fresh => migration::Migrator::fresh(&db).await?,
        Command::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}
