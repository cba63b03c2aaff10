//! Per-process composition of loading, cleaning and caching.

use anyhow::Result;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::cache::{self, SessionCache, TableToken};
use crate::clean::{clean_with_report, CleanReport};
use crate::config::PipelineConfig;

/// A clean table together with the stage counts that produced it.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub table: Arc<RecordBatch>,
    pub report: Arc<CleanReport>,
}

/// Owns the in-memory caches for one run. Every method returns what the
/// corresponding direct call would.
pub struct Session {
    config: PipelineConfig,
    raw: SessionCache<String, Arc<RecordBatch>>,
    clean: SessionCache<TableToken, CleanedTable>,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            raw: SessionCache::new(),
            clean: SessionCache::new(),
        }
    }

    fn raw_key(&self) -> Result<String> {
        let signature = cache::compute_signature(&self.config.data_dir, &self.config.pattern)?;
        Ok(format!(
            "{}|{}|{}",
            self.config.data_dir.display(),
            signature.canonical()?,
            self.config.use_cache
        ))
    }

    /// Raw table, memoised on the directory signature. A forced rebuild
    /// skips the memo and replaces it.
    pub fn load_raw(&self) -> Result<Arc<RecordBatch>> {
        let key = self.raw_key()?;
        let cfg = &self.config;
        let load = || {
            cache::load_raw(
                &cfg.data_dir,
                &cfg.pattern,
                cfg.use_cache,
                cfg.force_rebuild,
                &cfg.ingest,
            )
            .map(Arc::new)
        };

        if cfg.force_rebuild {
            let raw = load()?;
            self.raw.insert(key, Arc::clone(&raw));
            return Ok(raw);
        }
        self.raw.get_or_compute(key, load)
    }

    /// Clean `raw`, memoised on the identity of the `Arc`. A fresh result is
    /// written to the cache directory when `persist_clean` is set; a failed
    /// write is only logged.
    pub fn clean(&self, raw: &Arc<RecordBatch>) -> Result<CleanedTable> {
        self.clean.get_or_compute(TableToken::of(raw), || {
            let (table, report) = clean_with_report(raw, &self.config.clean)?;
            if self.config.persist_clean {
                cache::persist_clean_best_effort(&table, &self.config.cache_dir());
            }
            Ok(CleanedTable {
                table: Arc::new(table),
                report: Arc::new(report),
            })
        })
    }
}
