// src/process/mod.rs
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use glob::{glob, Pattern};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::columns::PREFERRED_RAW_ORDER;
use crate::config::IngestConfig;

pub mod concat;
pub mod date_parser;
pub mod ingest;
pub mod sniff;
pub mod utils;

pub use ingest::read_one_csv;
pub use utils::{coerce_numeric, normalize_header};

/// No file in `dir` matched `pattern`. Loading cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatchingFiles {
    pub dir: PathBuf,
    pub pattern: String,
}

impl fmt::Display for NoMatchingFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no file found in {} (pattern {})",
            self.dir.display(),
            self.pattern
        )
    }
}

impl std::error::Error for NoMatchingFiles {}

/// Regular files in `dir` matching `pattern`, in lexical order of file name.
/// A missing directory yields an empty list.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        Pattern::escape(&dir.display().to_string()),
        pattern
    );
    let mut files: Vec<PathBuf> = glob(&full)
        .with_context(|| format!("invalid glob pattern {}", full))?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Ingest every matching file and stack them into one raw table, preferred
/// columns first.
#[tracing::instrument(level = "info", skip(dir, cfg), fields(dir = %dir.display()))]
pub fn load_directory(dir: &Path, pattern: &str, cfg: &IngestConfig) -> Result<RecordBatch> {
    let files = matching_files(dir, pattern)?;
    if files.is_empty() {
        return Err(NoMatchingFiles {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
        }
        .into());
    }

    let mut batches = Vec::with_capacity(files.len());
    for path in &files {
        batches.push(read_one_csv(path, cfg)?);
    }
    let raw = concat::concat_union(&batches)?;
    let raw = concat::reorder_preferred(&raw, &PREFERRED_RAW_ORDER)?;
    info!(
        files = files.len(),
        rows = raw.num_rows(),
        cols = raw.num_columns(),
        "loaded raw table"
    );
    Ok(raw)
}
