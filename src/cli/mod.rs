use crate::dates::DateKey;
use crate::errors::DateKeyError;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// A local-first daily todo list and journal
#[derive(Parser, Debug)]
#[clap(name = "daylog", about = "A local-first daily todo list and journal")]
#[clap(author, version, long_about = None)]
pub struct CliArgs {
    /// Print verbose output
    #[clap(short = 'v', long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Add a todo for today (or a future day)
    Add {
        /// What needs doing
        text: String,
        #[clap(flatten)]
        date: DateArg,
    },

    /// Mark a todo done, or not done again
    Toggle {
        /// Id of the todo
        id: String,
        #[clap(flatten)]
        date: DateArg,
    },

    /// Show the todos for a day
    List {
        #[clap(flatten)]
        date: DateArg,
    },

    /// Show every day that has todos, newest first
    Days,

    /// Write or read journal entries
    #[clap(subcommand)]
    Journal(JournalCommand),

    /// Print all data as an export document
    Export {
        /// Write to this file instead of stdout
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Merge an export document into the stored data
    Import {
        /// File to read; `-` or nothing reads stdin
        input: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum JournalCommand {
    /// Add a journal entry for today
    Add {
        /// The entry text
        text: String,
    },

    /// Show the journal entries for a day
    List {
        #[clap(flatten)]
        date: DateArg,
    },
}

#[derive(Args, Debug, PartialEq, Default)]
pub struct DateArg {
    /// Day to act on (format: YYYY-MM-DD, defaults to today)
    #[clap(short = 'd', long = "date")]
    pub value: Option<String>,
}

impl DateArg {
    /// The requested day, or `today` when none was given.
    pub fn resolve(&self, today: NaiveDate) -> Result<DateKey, DateKeyError> {
        match &self.value {
            Some(raw) => raw.parse(),
            None => Ok(DateKey::new(today)),
        }
    }
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse() -> Self {
        CliArgs::parse_from(std::env::args())
    }
}
