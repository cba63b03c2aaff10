use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, BooleanArray, StringBuilder},
    datatypes::{DataType, Field},
    record_batch::RecordBatch,
};
use csv::ReaderBuilder;
use std::{collections::HashMap, fs, path::Path, sync::Arc};
use tracing::{debug, info, warn};

use crate::columns::{ANNEE, CODE_DEPARTEMENT, DATE_MUTATION, INGEST_NUMERIC};
use crate::config::IngestConfig;
use crate::process::{
    date_parser::{parse_date_array, year_array},
    sniff::{strategies, Strategy, FINAL_STRATEGY},
    utils::{clean_str, coerce_numeric_array, is_na_token, normalize_header},
};
use crate::table;

/// Read one DVF extract of unknown delimiter/encoding into a standardized
/// table restricted to the configured region.
#[tracing::instrument(level = "info", skip(path, cfg), fields(path = %path.display()))]
pub fn read_one_csv(path: &Path, cfg: &IngestConfig) -> Result<RecordBatch> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed = parse_with_fallbacks(&bytes)
        .with_context(|| format!("no parse strategy succeeded for {}", path.display()))?;
    let rows_read = parsed.num_rows();
    let out = standardize(parsed, cfg)?;
    info!(rows_read, rows_kept = out.num_rows(), cols = out.num_columns(), "ingested");
    Ok(out)
}

/// Try every guarded strategy in order; a result with a single column counts
/// as a misdetected delimiter. If none qualifies, the final unguarded attempt
/// decides, and its error is the one reported.
pub fn parse_with_fallbacks(bytes: &[u8]) -> Result<RecordBatch> {
    for strategy in strategies() {
        match parse_with(bytes, strategy) {
            Ok(batch) if batch.num_columns() > 1 => {
                debug!(strategy = %strategy.describe(), "parsed");
                return Ok(batch);
            }
            Ok(_) => debug!(strategy = %strategy.describe(), "single column, trying next"),
            Err(e) => debug!(strategy = %strategy.describe(), error = %e, "failed, trying next"),
        }
    }
    warn!("every encoding/delimiter combination failed, final attempt");
    parse_with(bytes, FINAL_STRATEGY)
}

pub fn parse_with(bytes: &[u8], strategy: Strategy) -> Result<RecordBatch> {
    let (text, delimiter) = strategy.prepare(bytes)?;
    parse_text(&text, delimiter)
}

/// Parse delimited text with a header row; every field stays text.
pub fn parse_text(text: &str, delimiter: u8) -> Result<RecordBatch> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let raw_headers: Vec<String> = rdr
        .headers()
        .context("reading header row")?
        .iter()
        .map(str::to_string)
        .collect();
    if raw_headers.is_empty() || (raw_headers.len() == 1 && raw_headers[0].trim().is_empty()) {
        bail!("no columns to parse");
    }
    let width = raw_headers.len();

    let mut builders: Vec<StringBuilder> = (0..width).map(|_| StringBuilder::new()).collect();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        if record.len() > width {
            bail!(
                "expected {} fields in line {}, saw {}",
                width,
                idx + 2,
                record.len()
            );
        }
        for (col, builder) in builders.iter_mut().enumerate() {
            match record.get(col) {
                Some(cell) if !is_na_token(cell) => builder.append_value(cell),
                _ => builder.append_null(),
            }
        }
    }

    let fields: Vec<Field> = unique_headers(&raw_headers)
        .into_iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let columns: Vec<ArrayRef> = builders
        .iter_mut()
        .map(|b| Arc::new(b.finish()) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(arrow::datatypes::Schema::new(fields)), columns)
        .context("building text batch")
}

/// Normalize headers, keeping them distinct. Repeated raw names become
/// `name.1`, `name.2`… before normalization; collisions created by
/// normalization itself get a `_n` suffix.
pub fn unique_headers(raw: &[String]) -> Vec<String> {
    let mut raw_seen: HashMap<&str, usize> = HashMap::new();
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(raw.len());

    for header in raw {
        let n = raw_seen.entry(header.as_str()).or_insert(0);
        let mangled = if *n == 0 {
            header.clone()
        } else {
            format!("{}.{}", header, n)
        };
        *n += 1;

        let mut name = normalize_header(&mangled);
        if let Some(count) = used.get_mut(&name) {
            *count += 1;
            name = format!("{}_{}", name, count);
        }
        used.entry(name.clone()).or_insert(0);
        out.push(name);
    }
    out
}

/// Dates + year, region filter, numeric coercion.
pub fn standardize(batch: RecordBatch, cfg: &IngestConfig) -> Result<RecordBatch> {
    let mut out = batch;

    if let Some(raw_dates) = table::column(&out, DATE_MUTATION).cloned() {
        let dates = parse_date_array(&raw_dates);
        let years = year_array(dates.as_any().downcast_ref().context("date column")?);
        out = table::with_column(&out, DATE_MUTATION, dates)?;
        out = table::with_column(&out, ANNEE, Arc::new(years))?;
    }

    if let Some(codes) = table::utf8_column(&out, CODE_DEPARTEMENT)? {
        let trimmed: arrow::array::StringArray = codes.iter().map(|c| c.map(clean_str)).collect();
        let keep: BooleanArray = trimmed
            .iter()
            .map(|c| Some(c == Some(cfg.region_code.as_str())))
            .collect();
        out = table::with_column(&out, CODE_DEPARTEMENT, Arc::new(trimmed))?;
        out = table::filter(&out, &keep)?;
    }

    for name in INGEST_NUMERIC {
        if let Some(col) = table::column(&out, name).cloned() {
            out = table::with_column(&out, name, coerce_numeric_array(&col)?)?;
        }
    }

    Ok(out)
}
