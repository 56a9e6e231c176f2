//! csvlite CLI Library
//!
//! Command-line interface for loading delimited text files into SQLite.
//!
//! # Overview
//!
//! - **Conversion**: load one file into `<table>.db` and write the bad-rows and
//!   stats files next to it (`csvlite convert`)
//! - **Type reference**: list the column types a table can use (`csvlite types`)
//!
//! Column types come from a YAML types file, a single default type, or an
//! interactive prompt when stdin is a terminal.

pub mod commands;
pub mod config;
pub mod error;
pub mod prompt;
pub mod types_file;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand, ValueEnum};
use csvlite_common::TypeTag;
use std::path::PathBuf;

/// csvlite - load delimited text files into typed SQLite tables
#[derive(Parser, Debug)]
#[command(name = "csvlite")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a delimited text file into a SQLite table
    Convert(ConvertArgs),

    /// List the column types
    Types,
}

/// Arguments of `csvlite convert`
#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Source file; its name up to the first '.' names the table
    pub source: PathBuf,

    /// Directory for <table>.db, <table>-bad.csv and <table>.log
    /// (defaults to CSVLITE_TARGET_DIR, then the current directory)
    #[arg(short = 'o', long)]
    pub target_dir: Option<PathBuf>,

    /// YAML file mapping column names to types
    #[arg(short, long)]
    pub types: Option<PathBuf>,

    /// Type for columns without a mapping; with no types file, every column gets it
    #[arg(short, long)]
    pub default_type: Option<TypeTag>,

    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Quote character
    #[arg(long, default_value_t = '"')]
    pub quote: char,

    /// Blank unquoted fields made only of letters, digits and '_' (old converter behavior)
    #[arg(long)]
    pub legacy_blank_fields: bool,

    /// Trim whitespace around each line and drop one trailing delimiter (old converter behavior)
    #[arg(long)]
    pub strip_line_edges: bool,

    /// Run the conversion in memory without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// How command results are printed on stdout
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
