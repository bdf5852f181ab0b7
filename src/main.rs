/*!
# Daylog - A Local-First Daily Todo List and Journal

This file contains the binary's application flow: it sets up logging, loads
configuration, opens the store and dispatches the requested command.

## Usage

```
daylog [OPTIONS] <COMMAND>

Commands:
  add       Add a todo for today (or a future day)
  toggle    Mark a todo done, or not done again
  list      Show the todos for a day
  days      Show every day that has todos, newest first
  journal   Write or read journal entries
  export    Print all data as an export document
  import    Merge an export document into the stored data

Options:
  -v, --verbose  Print verbose output
  -h, --help     Print help
  -V, --version  Print version
```

## Configuration

- `DAYLOG_DIR`: The directory to store data in (defaults to "~/.daylog")
- `DAYLOG_LOG_FORMAT`: `json` for structured logs on stderr
- `RUST_LOG`: Log filter (defaults to `info`, or `debug` with `--verbose`)
*/

use chrono::{DateTime, Local, Utc};
use daylog::cli::{CliArgs, Command, JournalCommand};
use daylog::config::{Config, LogFormat};
use daylog::dates::{self, DateKey};
use daylog::errors::AppResult;
use daylog::storage::FileStore;
use daylog::transfer;
use daylog::Tracker;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Obtain current date/time once at the beginning
    let current_datetime = Local::now();

    let args = CliArgs::parse();
    init_logging(args.verbose, Config::log_format_from_env());
    debug!("CLI arguments: {:?}", args);

    match run(args, &current_datetime) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder
            .with_ansi(io::stderr().is_terminal())
            .with_target(false)
            .init(),
    }
}

fn run(args: CliArgs, now: &DateTime<Local>) -> AppResult<ExitCode> {
    info!("Loading configuration");
    let config = Config::load()?;
    config.validate()?;
    debug!("Configuration: {:?}", config);

    let store = FileStore::open(&config.data_dir)?;
    let mut tracker = Tracker::new(store);
    let today = now.date_naive();

    match args.command {
        Command::Add { text, date } => {
            let date = date.resolve(today)?;
            let todo = tracker.add_todo_for_date(date, &text, now)?;
            println!("{}", todo.id);
        }
        Command::Toggle { id, date } => {
            let date = date.resolve(today)?;
            let todo = tracker.toggle_todo(date, &id, now)?;
            println!("{} {}", checkbox(todo.completed), todo.text);
        }
        Command::List { date } => {
            let date = date.resolve(today)?;
            print_day_header(&tracker, date, today)?;
            let todos = tracker.todos_for_date(date)?;
            if todos.is_empty() {
                println!("  No todos for this day");
            }
            for todo in todos {
                println!("  {} {}  {}", checkbox(todo.completed), todo.id, todo.text);
            }
        }
        Command::Days => {
            for date in tracker.dates_with_todos()? {
                print_day_header(&tracker, date, today)?;
            }
        }
        Command::Journal(JournalCommand::Add { text }) => {
            let entry = tracker.add_journal_entry(&text, now)?;
            println!("{}", entry.id);
        }
        Command::Journal(JournalCommand::List { date }) => {
            let date = date.resolve(today)?;
            for entry in tracker.journal_for_date(date)? {
                println!("{}  {}", dates::format_time(&entry.created_at), entry.text);
            }
        }
        Command::Export { output } => {
            let text = transfer::export_json(tracker.storage(), now.with_timezone(&Utc))?;
            match output {
                Some(path) => {
                    fs::write(&path, text)?;
                    info!("Export written to {:?}", path);
                }
                None => println!("{}", text),
            }
        }
        Command::Import { input } => {
            let raw = read_input(input.as_deref())?;
            let outcome = transfer::import_text(tracker.storage_mut(), &raw);
            println!("{}", outcome.message);
            if !outcome.success {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_day_header(
    tracker: &Tracker<FileStore>,
    date: DateKey,
    today: chrono::NaiveDate,
) -> AppResult<()> {
    let stats = tracker.todo_stats(date)?;
    let marker = if date.date() == today { " (Today)" } else { "" };
    println!(
        "{}  {}{}  {}/{}",
        date,
        dates::format_date(date),
        marker,
        stats.completed,
        stats.total
    );
    Ok(())
}

fn checkbox(completed: bool) -> &'static str {
    if completed {
        "[x]"
    } else {
        "[ ]"
    }
}

fn read_input(input: Option<&Path>) -> io::Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
