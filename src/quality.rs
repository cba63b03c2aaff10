//! Raw-vs-clean summary and source-year coverage.

use anyhow::Result;
use arrow::{
    array::{Array, AsArray},
    datatypes::{DataType, Date32Type, Int16Type},
    record_batch::RecordBatch,
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
};
use tracing::{info, warn};

use crate::columns::{ANNEE, DATE_MUTATION, NATURE_MUTATION};
use crate::process::{date_parser::days_to_date, matching_files};
use crate::table;

pub const MISSING_LABEL: &str = "<missing>";
const TOP_NATURES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub rows_raw: usize,
    pub rows_clean: usize,
    pub exclusion_rate_pct: f64,
    pub nature_top_raw: Vec<ValueCount>,
    pub raw_date_min: Option<String>,
    pub raw_date_max: Option<String>,
    pub clean_date_min: Option<String>,
    pub clean_date_max: Option<String>,
    pub clean_missing_pct: Vec<ColumnMissing>,
    pub clean_rows_per_year: BTreeMap<i16, usize>,
}

impl QualityReport {
    pub fn build(raw: &RecordBatch, clean: &RecordBatch) -> Result<Self> {
        let rows_raw = raw.num_rows();
        let rows_clean = clean.num_rows();
        let excluded = rows_raw.saturating_sub(rows_clean) as f64;
        let (raw_date_min, raw_date_max) = date_range(raw);
        let (clean_date_min, clean_date_max) = date_range(clean);

        let report = Self {
            rows_raw,
            rows_clean,
            exclusion_rate_pct: round_to(100.0 * excluded / rows_raw.max(1) as f64, 2),
            nature_top_raw: top_values(raw, NATURE_MUTATION, TOP_NATURES)?,
            raw_date_min,
            raw_date_max,
            clean_date_min,
            clean_date_max,
            clean_missing_pct: missing_pct(clean),
            clean_rows_per_year: rows_per_year(clean),
        };
        info!(
            rows_raw,
            rows_clean,
            exclusion_rate_pct = report.exclusion_rate_pct,
            "quality report"
        );
        Ok(report)
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

/// Most frequent values of a column, nulls counted as [`MISSING_LABEL`].
/// Equal counts keep the order of first appearance.
fn top_values(batch: &RecordBatch, name: &str, limit: usize) -> Result<Vec<ValueCount>> {
    let Some(values) = table::utf8_column(batch, name)? else {
        return Ok(Vec::new());
    };
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();
    for v in values.iter() {
        let key = v.unwrap_or(MISSING_LABEL);
        match index.get(key) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(key, counts.len());
                counts.push(ValueCount {
                    value: key.to_string(),
                    count: 1,
                });
            }
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    Ok(counts)
}

fn date_range(batch: &RecordBatch) -> (Option<String>, Option<String>) {
    let Some(col) = table::column(batch, DATE_MUTATION) else {
        return (None, None);
    };
    if col.data_type() != &DataType::Date32 {
        return (None, None);
    }
    let dates = col.as_primitive::<Date32Type>();
    let iso = |d: Option<i32>| {
        d.and_then(days_to_date)
            .map(|d| d.format("%Y-%m-%d").to_string())
    };
    (
        iso(dates.iter().flatten().min()),
        iso(dates.iter().flatten().max()),
    )
}

/// Share of nulls per column, highest first, one decimal.
fn missing_pct(batch: &RecordBatch) -> Vec<ColumnMissing> {
    let rows = batch.num_rows().max(1) as f64;
    let mut out: Vec<ColumnMissing> = batch
        .schema_ref()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, col)| ColumnMissing {
            column: field.name().clone(),
            pct: round_to(100.0 * col.null_count() as f64 / rows, 1),
        })
        .collect();
    out.sort_by(|a, b| b.pct.total_cmp(&a.pct));
    out
}

fn rows_per_year(batch: &RecordBatch) -> BTreeMap<i16, usize> {
    let mut out = BTreeMap::new();
    if let Some(col) = table::column(batch, ANNEE).filter(|c| c.data_type() == &DataType::Int16) {
        for year in col.as_primitive::<Int16Type>().iter().flatten() {
            *out.entry(year).or_insert(0) += 1;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCoverage {
    pub found: Vec<i32>,
    pub missing: Vec<i32>,
}

/// Years present among the source file names (`<anything>_<year>.<ext>`)
/// and expected years with no file.
pub fn year_coverage(dir: &Path, pattern: &str, expected_years: &[i32]) -> Result<YearCoverage> {
    let found: BTreeSet<i32> = matching_files(dir, pattern)?
        .iter()
        .filter_map(|p| p.file_stem()?.to_str()?.rsplit('_').next()?.parse().ok())
        .collect();
    let missing: Vec<i32> = expected_years
        .iter()
        .copied()
        .filter(|y| !found.contains(y))
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "no source file for some years");
    }
    Ok(YearCoverage {
        found: found.into_iter().collect(),
        missing,
    })
}
