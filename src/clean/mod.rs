//! Deterministic cleaning of the raw transaction table.
//!
//! The stages run in a fixed order; each one is a pure function of its input
//! table and the [`CleanConfig`]. The input is never modified.

pub mod bucket;
pub mod quantile;
pub mod stages;

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::CleanConfig;

type Stage = fn(RecordBatch, &CleanConfig) -> Result<RecordBatch>;

const STAGES: [(&str, Stage); 11] = [
    ("coerce", stages::coerce),
    ("dedupe", stages::dedupe),
    ("scope", stages::scope),
    ("complete", stages::complete),
    ("subregion", stages::subregion),
    ("price_per_area", stages::price_per_area),
    ("censor_area", stages::censor_area),
    ("censor_price", stages::censor_price),
    ("temporal", stages::temporal),
    ("bucket", stages::bucket),
    ("project", stages::project),
];

/// Row counts before and after one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: &'static str,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl StageCount {
    pub fn rows_removed(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub stages: Vec<StageCount>,
}

impl CleanReport {
    pub fn total_removed(&self) -> usize {
        self.stages.iter().map(StageCount::rows_removed).sum()
    }
}

pub fn clean(raw: &RecordBatch, cfg: &CleanConfig) -> Result<RecordBatch> {
    clean_with_report(raw, cfg).map(|(table, _)| table)
}

#[tracing::instrument(level = "info", skip(raw, cfg), fields(rows = raw.num_rows()))]
pub fn clean_with_report(raw: &RecordBatch, cfg: &CleanConfig) -> Result<(RecordBatch, CleanReport)> {
    let mut table = raw.clone();
    let mut report = CleanReport::default();

    for (name, stage) in STAGES {
        let rows_in = table.num_rows();
        table = stage(table, cfg).with_context(|| format!("cleaning stage `{}`", name))?;
        let rows_out = table.num_rows();
        debug!(stage = name, rows_in, rows_out, "stage done");
        report.stages.push(StageCount {
            stage: name,
            rows_in,
            rows_out,
        });
    }

    info!(
        rows_in = raw.num_rows(),
        rows_out = table.num_rows(),
        removed = report.total_removed(),
        cols = table.num_columns(),
        "clean table ready"
    );
    Ok((table, report))
}
