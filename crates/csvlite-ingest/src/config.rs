//! Ingestion run configuration

use crate::artifacts::ArtifactPaths;
use crate::error::{IngestError, Result};
use crate::tokenizer::TokenizerOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where to read from, where to write to, and how to tokenize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Delimited text file; its name (up to the first `.`) names the table
    pub source_path: PathBuf,

    /// Directory receiving `<table>.db`, `<table>-bad.csv` and `<table>.log`
    pub target_directory: PathBuf,

    #[serde(default)]
    pub tokenizer: TokenizerOptions,

    /// When false the run still commits but writes no bad-rows or stats file
    #[serde(default = "default_write_artifacts")]
    pub write_artifacts: bool,
}

fn default_write_artifacts() -> bool {
    true
}

impl IngestConfig {
    pub fn new(source_path: impl Into<PathBuf>, target_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            target_directory: target_directory.into(),
            tokenizer: TokenizerOptions::default(),
            write_artifacts: true,
        }
    }

    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Table name derived from the source file name up to its first `.`
    pub fn table_name(&self) -> Result<String> {
        table_name_for(&self.source_path)
    }

    /// Where the database, bad-rows and stats files of this run go
    pub fn artifact_paths(&self) -> Result<ArtifactPaths> {
        Ok(ArtifactPaths::new(&self.target_directory, &self.table_name()?))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.artifact_paths()?.database)
    }

    pub fn rejected_path(&self) -> Result<PathBuf> {
        Ok(self.artifact_paths()?.rejected)
    }

    pub fn stats_path(&self) -> Result<PathBuf> {
        Ok(self.artifact_paths()?.stats)
    }

    /// Check everything that can be checked without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        let TokenizerOptions {
            delimiter, quote, ..
        } = self.tokenizer;

        if !delimiter.is_ascii() || (delimiter.is_ascii_control() && delimiter != '\t') {
            return Err(IngestError::config(format!(
                "delimiter {delimiter:?} must be a printable ASCII character or tab"
            )));
        }
        if !quote.is_ascii() || quote.is_ascii_control() {
            return Err(IngestError::config(format!(
                "quote character {quote:?} must be a printable ASCII character"
            )));
        }
        if delimiter == quote {
            return Err(IngestError::config(
                "delimiter and quote character must differ",
            ));
        }
        if self.target_directory.as_os_str().is_empty() {
            return Err(IngestError::config("target directory is empty"));
        }

        self.table_name().map(|_| ())
    }
}

fn table_name_for(source: &Path) -> Result<String> {
    let file_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::config(format!(
                "source path '{}' does not name a file",
                source.display()
            ))
        })?;

    let table = file_name.split('.').next().unwrap_or_default().trim();
    if table.is_empty() {
        return Err(IngestError::config(format!(
            "cannot derive a table name from '{file_name}'"
        )));
    }

    Ok(table.to_string())
}

/// Builder for IngestConfig
#[derive(Default)]
pub struct IngestConfigBuilder {
    source_path: Option<PathBuf>,
    target_directory: Option<PathBuf>,
    tokenizer: TokenizerOptions,
    write_artifacts: Option<bool>,
}

impl IngestConfigBuilder {
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn target_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_directory = Some(dir.into());
        self
    }

    pub fn tokenizer(mut self, options: TokenizerOptions) -> Self {
        self.tokenizer = options;
        self
    }

    pub fn write_artifacts(mut self, enabled: bool) -> Self {
        self.write_artifacts = Some(enabled);
        self
    }

    pub fn build(self) -> Result<IngestConfig> {
        let source_path = self
            .source_path
            .ok_or_else(|| IngestError::config("source path is required"))?;

        let config = IngestConfig {
            source_path,
            target_directory: self.target_directory.unwrap_or_else(|| PathBuf::from(".")),
            tokenizer: self.tokenizer,
            write_artifacts: self.write_artifacts.unwrap_or(true),
        };
        config.validate()?;

        Ok(config)
    }
}
