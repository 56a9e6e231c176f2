//! `csvlite convert` command implementation
//!
//! Loads one delimited file into `<target>/<table>.db`. The conversion runs on
//! a blocking thread; Ctrl-C cancels it, which rolls the table back.

use crate::config::Config;
use crate::error::{CliError, Result};
use crate::prompt::PromptResolver;
use crate::types_file::TypesFile;
use crate::{ConvertArgs, OutputFormat};
use colored::Colorize;
use csvlite_common::{ColumnDefinition, IngestionStats};
use csvlite_ingest::{
    ArtifactPaths, BlankFieldRule, CancellationToken, Converter, IngestConfig, LineEdges,
    RunOutcome, TokenizerOptions, TypeResolver, UniformResolver,
};
use serde::Serialize;
use std::io::IsTerminal;
use tracing::{debug, warn};

/// Rejected rows listed in the text summary
const REJECTED_PREVIEW: usize = 5;

type BoxedResolver = Box<dyn TypeResolver + Send>;

/// Convert a file
pub async fn run(args: ConvertArgs, config: Config) -> Result<()> {
    let ingest_config = ingest_config(&args, &config)?;
    let mut resolver = select_resolver(&args, &config, std::io::stdin().is_terminal())?;

    let cancel = CancellationToken::new();
    let converter = Converter::new(ingest_config)?.with_cancellation(cancel.clone());
    let dry_run = args.dry_run;

    debug!(source = %args.source.display(), dry_run, "Starting conversion");
    let mut task = tokio::task::spawn_blocking(move || {
        if dry_run {
            converter.dry_run(resolver.as_mut())
        } else {
            converter.convert(resolver.as_mut())
        }
    });

    let joined = tokio::select! {
        joined = &mut task => joined,
        signal = tokio::signal::ctrl_c() => {
            if signal.is_ok() {
                warn!("Interrupted, cancelling conversion");
                cancel.cancel();
            }
            task.await
        }
    };
    let outcome = joined.map_err(|e| CliError::Task(e.to_string()))??;

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&outcome, dry_run)),
        OutputFormat::Json => println!("{}", render_json(&outcome, dry_run)?),
    }

    Ok(())
}

fn ingest_config(args: &ConvertArgs, config: &Config) -> Result<IngestConfig> {
    if !args.source.is_file() {
        return Err(CliError::FileNotFound(args.source.display().to_string()));
    }

    let blank_fields = if args.legacy_blank_fields {
        BlankFieldRule::LegacyWordChars
    } else {
        BlankFieldRule::Whitespace
    };
    let line_edges = if args.strip_line_edges {
        LineEdges::Strip
    } else {
        LineEdges::Keep
    };

    let ingest_config = IngestConfig::builder()
        .source_path(&args.source)
        .target_directory(
            args.target_dir
                .clone()
                .unwrap_or_else(|| config.target_dir.clone()),
        )
        .tokenizer(TokenizerOptions {
            delimiter: args.delimiter,
            quote: args.quote,
            blank_fields,
            line_edges,
        })
        .write_artifacts(!args.dry_run)
        .build()?;

    Ok(ingest_config)
}

/// Types file first, then a uniform default, then the prompt
fn select_resolver(args: &ConvertArgs, config: &Config, interactive: bool) -> Result<BoxedResolver> {
    let default_type = args.default_type.or(config.default_type);

    if let Some(ref path) = args.types {
        let resolver = TypesFile::load(path)?.into_resolver(path, default_type)?;
        debug!(path = %path.display(), mapped = resolver.len(), "Loaded types file");
        return Ok(Box::new(resolver));
    }

    if let Some(tag) = default_type {
        return Ok(Box::new(UniformResolver::new(tag)));
    }

    if interactive {
        return Ok(Box::new(PromptResolver));
    }

    Err(CliError::no_types(
        "stdin is not a terminal, so column types cannot be asked for. \
         Pass --types <FILE> or --default-type <TYPE>",
    ))
}

fn render_text(outcome: &RunOutcome, dry_run: bool) -> String {
    let summary = match outcome {
        RunOutcome::Skipped { table } => {
            return format!(
                "{} Table '{}' already exists, nothing was loaded\n",
                "•".yellow(),
                table
            );
        },
        RunOutcome::Completed(summary) => summary,
    };

    let mut out = String::new();
    let verb = if dry_run { "Checked" } else { "Loaded" };
    out.push_str(&format!(
        "{} {} table '{}' ({} columns)\n",
        "✓".green(),
        verb,
        summary.table,
        summary.schema.len()
    ));
    out.push_str(&format!("  Received: {}\n", summary.stats.received));
    out.push_str(&format!("  Inserted: {}\n", summary.stats.accepted));
    let failed = summary.stats.rejected.to_string();
    let failed = if summary.stats.rejected > 0 {
        failed.as_str().red()
    } else {
        failed.as_str().normal()
    };
    out.push_str(&format!("  Failed:   {}\n", failed));

    for row in summary.rejected.iter().take(REJECTED_PREVIEW) {
        out.push_str(&format!("    line {}: {}\n", row.line, row.reason));
    }
    if summary.rejected.len() > REJECTED_PREVIEW {
        out.push_str(&format!(
            "    ... and {} more\n",
            summary.rejected.len() - REJECTED_PREVIEW
        ));
    }

    match summary.artifacts {
        Some(ref paths) => {
            out.push_str(&format!("  Database: {}\n", paths.database.display()));
            out.push_str(&format!("  Bad rows: {}\n", paths.rejected.display()));
            out.push_str(&format!("  Stats:    {}\n", paths.stats.display()));
        },
        None if dry_run => out.push_str("  Dry run, no files written\n"),
        None => {},
    }

    out
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum ReportStatus {
    Completed,
    Skipped,
}

#[derive(Debug, Serialize)]
struct RejectedReport {
    line: u64,
    reason: String,
}

#[derive(Debug, Serialize)]
struct ConvertReport<'a> {
    table: &'a str,
    status: ReportStatus,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<&'a [ColumnDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a IngestionStats>,
    rejected: Vec<RejectedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<&'a ArtifactPaths>,
}

fn render_json(outcome: &RunOutcome, dry_run: bool) -> Result<String> {
    let report = match outcome {
        RunOutcome::Skipped { table } => ConvertReport {
            table,
            status: ReportStatus::Skipped,
            dry_run,
            columns: None,
            stats: None,
            rejected: Vec::new(),
            artifacts: None,
        },
        RunOutcome::Completed(summary) => ConvertReport {
            table: &summary.table,
            status: ReportStatus::Completed,
            dry_run,
            columns: Some(summary.schema.columns()),
            stats: Some(&summary.stats),
            rejected: summary
                .rejected
                .iter()
                .map(|row| RejectedReport {
                    line: row.line,
                    reason: row.reason.to_string(),
                })
                .collect(),
            artifacts: summary.artifacts.as_ref(),
        },
    };

    Ok(serde_json::to_string_pretty(&report)?)
}
