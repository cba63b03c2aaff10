use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use super::parquet::{read_json, read_snapshot, write_json, write_snapshot};
use super::signature::{compute_signature, same_signature, DirSignature};
use crate::config::IngestConfig;
use crate::process::load_directory;
use crate::table;

pub const CACHE_DIR_NAME: &str = ".cache";
pub const RAW_SNAPSHOT: &str = "df_raw.parquet";
pub const RAW_META: &str = "df_raw.meta.json";
pub const CLEAN_SNAPSHOT: &str = "df_clean.parquet";
pub const CLEAN_META: &str = "df_clean.meta.json";

pub fn cache_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(CACHE_DIR_NAME)
}

/// Sidecar of the raw snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeta {
    pub created_at: i64,
    pub parquet_path: String,
    pub signature: DirSignature,
}

/// Sidecar of the clean snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanMeta {
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<String>,
}

/// Where a raw table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource {
    Snapshot,
    Rebuilt,
}

pub fn load_raw(
    dir: &Path,
    pattern: &str,
    use_cache: bool,
    force_rebuild: bool,
    cfg: &IngestConfig,
) -> Result<RecordBatch> {
    load_raw_with_source(dir, pattern, use_cache, force_rebuild, cfg).map(|(batch, _)| batch)
}

/// Raw table for `dir`, from the parquet snapshot when its recorded signature
/// matches the directory, otherwise rebuilt from the CSV files (and the
/// snapshot refreshed on a best-effort basis).
#[tracing::instrument(level = "info", skip(dir, cfg), fields(dir = %dir.display()))]
pub fn load_raw_with_source(
    dir: &Path,
    pattern: &str,
    use_cache: bool,
    force_rebuild: bool,
    cfg: &IngestConfig,
) -> Result<(RecordBatch, RawSource)> {
    let cache = cache_dir(dir);
    let snapshot = cache.join(RAW_SNAPSHOT);
    let meta = cache.join(RAW_META);
    let current = compute_signature(dir, pattern)?;

    if use_cache && !force_rebuild && snapshot.exists() && meta.exists() {
        match read_if_fresh(&snapshot, &meta, &current) {
            Ok(Some(batch)) => {
                info!(rows = batch.num_rows(), "raw snapshot is fresh");
                return Ok((batch, RawSource::Snapshot));
            }
            Ok(None) => info!("source files changed, rebuilding"),
            Err(e) => warn!(error = %format!("{:#}", e), "unreadable raw snapshot, rebuilding"),
        }
    } else if force_rebuild {
        info!("rebuild forced");
    }

    let raw = load_directory(dir, pattern, cfg)?;

    if use_cache {
        if let Err(e) = persist_raw(&raw, &cache, &current) {
            warn!(error = %format!("{:#}", e), "could not write raw snapshot");
        }
    }
    Ok((raw, RawSource::Rebuilt))
}

fn read_if_fresh(
    snapshot: &Path,
    meta_path: &Path,
    current: &DirSignature,
) -> Result<Option<RecordBatch>> {
    let meta: RawMeta = read_json(meta_path)?;
    if !same_signature(&meta.signature, current) {
        return Ok(None);
    }
    read_snapshot(snapshot).map(Some)
}

fn persist_raw(raw: &RecordBatch, cache: &Path, signature: &DirSignature) -> Result<()> {
    fs::create_dir_all(cache).with_context(|| format!("creating {}", cache.display()))?;
    let snapshot = cache.join(RAW_SNAPSHOT);
    let bytes = write_snapshot(raw, &snapshot)?;
    let meta = RawMeta {
        created_at: Utc::now().timestamp(),
        parquet_path: snapshot.display().to_string(),
        signature: signature.clone(),
    };
    write_json(&meta, &cache.join(RAW_META))?;
    debug!(bytes, "raw snapshot written");
    Ok(())
}

/// Write the clean snapshot and its row/column summary.
pub fn persist_clean(clean: &RecordBatch, cache: &Path) -> Result<()> {
    fs::create_dir_all(cache).with_context(|| format!("creating {}", cache.display()))?;
    let bytes = write_snapshot(clean, &cache.join(CLEAN_SNAPSHOT))?;
    let meta = CleanMeta {
        rows: clean.num_rows(),
        cols: clean.num_columns(),
        columns: table::column_names(clean),
    };
    write_json(&meta, &cache.join(CLEAN_META))?;
    debug!(bytes, rows = meta.rows, "clean snapshot written");
    Ok(())
}

/// [`persist_clean`] whose failure is only logged.
pub fn persist_clean_best_effort(clean: &RecordBatch, cache: &Path) {
    if let Err(e) = persist_clean(clean, cache) {
        warn!(error = %format!("{:#}", e), "could not write clean snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean;
    use crate::config::CleanConfig;
    use crate::testutil::{init_test_logging, write_sample_sources};
    use std::{
        fs::{File, FileTimes},
        time::{Duration, SystemTime},
    };
    use tempfile::tempdir;

    fn load(dir: &Path, use_cache: bool, force: bool) -> Result<(RecordBatch, RawSource)> {
        load_raw_with_source(dir, "75_*.csv", use_cache, force, &IngestConfig::default())
    }

    #[test]
    fn first_load_rebuilds_then_snapshot_is_used() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        write_sample_sources(dir.path())?;

        let (first, src) = load(dir.path(), true, false)?;
        assert_eq!(src, RawSource::Rebuilt);
        assert!(cache_dir(dir.path()).join(RAW_SNAPSHOT).exists());
        let meta: RawMeta = read_json(&cache_dir(dir.path()).join(RAW_META))?;
        assert_eq!(meta.signature.count, 2);

        let (second, src) = load(dir.path(), true, false)?;
        assert_eq!(src, RawSource::Snapshot);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn changed_sources_or_force_rebuild() -> Result<()> {
        let dir = tempdir()?;
        write_sample_sources(dir.path())?;
        load(dir.path(), true, false)?;

        let (_, src) = load(dir.path(), true, true)?;
        assert_eq!(src, RawSource::Rebuilt);

        let later = SystemTime::now() + Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(dir.path().join("75_2020.csv"))?
            .set_times(FileTimes::new().set_modified(later))?;
        let (_, src) = load(dir.path(), true, false)?;
        assert_eq!(src, RawSource::Rebuilt);

        let (_, src) = load(dir.path(), true, false)?;
        assert_eq!(src, RawSource::Snapshot);
        Ok(())
    }

    #[test]
    fn corrupt_metadata_is_a_miss() -> Result<()> {
        let dir = tempdir()?;
        write_sample_sources(dir.path())?;
        load(dir.path(), true, false)?;
        fs::write(cache_dir(dir.path()).join(RAW_META), "{ not json")?;

        let (_, src) = load(dir.path(), true, false)?;
        assert_eq!(src, RawSource::Rebuilt);
        // the rebuild repaired the sidecar
        let _: RawMeta = read_json(&cache_dir(dir.path()).join(RAW_META))?;
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_is_a_miss() -> Result<()> {
        let dir = tempdir()?;
        write_sample_sources(dir.path())?;
        let (fresh, _) = load(dir.path(), true, false)?;
        fs::write(cache_dir(dir.path()).join(RAW_SNAPSHOT), b"garbage")?;

        let (again, src) = load(dir.path(), true, false)?;
        assert_eq!(src, RawSource::Rebuilt);
        assert_eq!(fresh, again);
        Ok(())
    }

    #[test]
    fn cache_disabled_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        write_sample_sources(dir.path())?;
        let (_, src) = load(dir.path(), false, false)?;
        assert_eq!(src, RawSource::Rebuilt);
        assert!(!cache_dir(dir.path()).exists());
        Ok(())
    }

    #[test]
    fn unwritable_cache_still_returns_table() -> Result<()> {
        let dir = tempdir()?;
        write_sample_sources(dir.path())?;
        // a plain file where the cache directory should be
        fs::write(cache_dir(dir.path()), "in the way")?;
        let (raw, src) = load(dir.path(), true, false)?;
        assert_eq!(src, RawSource::Rebuilt);
        assert!(raw.num_rows() > 0);
        Ok(())
    }

    #[test]
    fn clean_snapshot_and_summary() -> Result<()> {
        let dir = tempdir()?;
        write_sample_sources(dir.path())?;
        let raw = load_raw(dir.path(), "75_*.csv", false, false, &IngestConfig::default())?;
        let clean = clean(&raw, &CleanConfig::default())?;
        let cache = cache_dir(dir.path());
        persist_clean(&clean, &cache)?;

        let meta: CleanMeta = read_json(&cache.join(CLEAN_META))?;
        assert_eq!(meta.rows, clean.num_rows());
        assert_eq!(meta.cols, clean.num_columns());
        assert_eq!(meta.columns, table::column_names(&clean));
        // Int16, Date32 and class labels come back with the same schema
        assert_eq!(read_snapshot(&cache.join(CLEAN_SNAPSHOT))?, clean);
        Ok(())
    }
}
