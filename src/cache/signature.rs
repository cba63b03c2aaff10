use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::UNIX_EPOCH};

use crate::process::matching_files;

/// Metadata stamp of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub name: String,
    pub size: u64,
    /// Whole seconds since the Unix epoch.
    pub mtime: i64,
}

/// Fingerprint of every file matching `pattern` in a directory, built from
/// stat calls only. A rewrite with identical size within the same second is
/// not detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirSignature {
    pub pattern: String,
    pub files: Vec<FileStamp>,
    pub count: usize,
    pub total_size: u64,
}

impl DirSignature {
    /// Sorted-key JSON; two signatures are the same iff these are equal.
    pub fn canonical(&self) -> Result<String> {
        // serde_json::Value objects are BTreeMap-backed, so keys come out sorted
        let value = serde_json::to_value(self).context("serializing signature")?;
        Ok(value.to_string())
    }
}

pub fn compute_signature(dir: &Path, pattern: &str) -> Result<DirSignature> {
    let mut files = Vec::new();
    for path in matching_files(dir, pattern)? {
        let meta =
            fs::metadata(&path).with_context(|| format!("stat {}", path.display()))?;
        let mtime = meta
            .modified()
            .with_context(|| format!("mtime of {}", path.display()))?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        files.push(FileStamp {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: meta.len(),
            mtime,
        });
    }

    Ok(DirSignature {
        pattern: pattern.to_string(),
        count: files.len(),
        total_size: files.iter().map(|f| f.size).sum(),
        files,
    })
}

/// Compare through the canonical form; a value that fails to serialize never
/// matches.
pub fn same_signature(a: &DirSignature, b: &DirSignature) -> bool {
    match (a.canonical(), b.canonical()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}
