//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use psdb_core::{Hash, KindStats, ResourceKind};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// The `data` parameter must be a serializable struct that includes
    /// `success: bool` and `result_code: u8` fields.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error chain directly.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Per-kind counts for `prune` command.
#[derive(Debug, Clone, Serialize)]
pub struct KindCountInfo {
    pub kind: ResourceKind,
    pub name: String,
    pub read: usize,
    pub decoded: usize,
    pub written: usize,
}

impl From<&KindStats> for KindCountInfo {
    fn from(stats: &KindStats) -> Self {
        Self {
            kind: stats.kind,
            name: stats.kind.display_name().to_string(),
            read: stats.read,
            decoded: stats.decoded,
            written: stats.written,
        }
    }
}

/// Output for `prune` command.
#[derive(Debug, Serialize)]
pub struct PruneOutput {
    pub success: bool,
    pub result_code: u8,
    pub input: String,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_application: Option<Hash>,
    pub kinds: Vec<KindCountInfo>,
}

/// Hashes of one kind for `ls` command.
#[derive(Debug, Clone, Serialize)]
pub struct KindListing {
    pub kind: ResourceKind,
    pub hashes: Vec<Hash>,
}

/// Output for `ls` command.
#[derive(Debug, Serialize)]
pub struct LsOutput {
    pub success: bool,
    pub result_code: u8,
    pub kinds: Vec<KindListing>,
}

/// Output for `cat` command.
#[derive(Debug, Serialize)]
pub struct CatOutput {
    pub success: bool,
    pub result_code: u8,
    pub kind: ResourceKind,
    pub hash: Hash,
    pub document: serde_json::Value,
}
