//! Cleaning stages. Each takes the table by value and returns it unchanged
//! when the columns it needs are absent.

use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int16Array, StringArray},
    datatypes::{DataType, Date32Type, Float64Type},
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use super::{bucket, quantile::quantile};
use crate::columns::*;
use crate::config::CleanConfig;
use crate::process::{
    date_parser::{days_to_date, quarter_label, year_array},
    utils::coerce_numeric_array,
};
use crate::table;

static POSTAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{5}").expect("static regex"));

const SALE: &str = "vente";
const RESIDENTIAL_TYPES: [&str; 2] = ["Appartement", "Maison"];

fn float_column(batch: &RecordBatch, name: &str) -> Result<Option<Float64Array>> {
    match table::column(batch, name) {
        None => Ok(None),
        Some(col) => Ok(Some(
            coerce_numeric_array(col)?.as_primitive::<Float64Type>().clone(),
        )),
    }
}

fn date_column(batch: &RecordBatch) -> Option<arrow::array::Date32Array> {
    table::column(batch, DATE_MUTATION)
        .filter(|c| c.data_type() == &DataType::Date32)
        .map(|c| c.as_primitive::<Date32Type>().clone())
}

/// 1. value / area / rooms as Float64.
pub fn coerce(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let mut out = batch;
    for name in CLEAN_NUMERIC {
        if let Some(col) = table::column(&out, name).cloned() {
            out = table::with_column(&out, name, coerce_numeric_array(&col)?)?;
        }
    }
    Ok(out)
}

/// 2. Earliest-first, then one row per transaction key.
pub fn dedupe(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let sorted = table::sort_nulls_last(&batch, DATE_MUTATION)?;

    let key_names: Vec<String> = if table::has_column(&sorted, ID_MUTATION) {
        [ID_MUTATION, NUMERO_DISPOSITION]
            .iter()
            .filter(|n| table::has_column(&sorted, n))
            .map(|n| n.to_string())
            .collect()
    } else {
        table::column_names(&sorted)
    };
    debug!(keys = ?key_names, "dedupe keys");

    let keys: Vec<ArrayRef> = key_names
        .iter()
        .filter_map(|n| table::column(&sorted, n).cloned())
        .collect();
    let keep = table::first_occurrence_mask(&keys, sorted.num_rows())?;
    table::filter(&sorted, &keep)
}

/// 3. Sales of flats and houses only.
pub fn scope(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let mut out = batch;
    if let Some(nature) = table::utf8_column(&out, NATURE_MUTATION)? {
        let keep: BooleanArray = nature
            .iter()
            .map(|v| Some(v.is_some_and(|s| s.trim().to_lowercase() == SALE)))
            .collect();
        out = table::filter(&out, &keep)?;
    }
    if let Some(kind) = table::utf8_column(&out, TYPE_LOCAL)? {
        let keep: BooleanArray = kind
            .iter()
            .map(|v| Some(v.is_some_and(|s| RESIDENTIAL_TYPES.contains(&s))))
            .collect();
        out = table::filter(&out, &keep)?;
    }
    Ok(out)
}

/// 4. Value, area and date must be present.
pub fn complete(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let needed: Vec<ArrayRef> = [VALEUR_FONCIERE, SURFACE_BATI, DATE_MUTATION]
        .iter()
        .filter_map(|n| table::column(&batch, n).cloned())
        .collect();
    if needed.is_empty() {
        return Ok(batch);
    }
    let keep: BooleanArray = (0..batch.num_rows())
        .map(|i| Some(needed.iter().all(|c| c.is_valid(i))))
        .collect();
    table::filter(&batch, &keep)
}

/// 5. Five-digit postal code within the region, and the sub-region number
/// taken from its last two digits.
pub fn subregion(batch: RecordBatch, cfg: &CleanConfig) -> Result<RecordBatch> {
    let Some(codes) = table::utf8_column(&batch, CODE_POSTAL)? else {
        return Ok(batch);
    };
    let extracted: StringArray = codes
        .iter()
        .map(|v| v.and_then(|s| POSTAL_CODE.find(s)).map(|m| m.as_str()))
        .collect();
    let keep: BooleanArray = extracted
        .iter()
        .map(|v| Some(v.is_some_and(|c| c.starts_with(cfg.postal_prefix.as_str()))))
        .collect();
    let out = table::with_column(&batch, CODE_POSTAL, Arc::new(extracted))?;
    let out = table::filter(&out, &keep)?;

    let codes = table::utf8_column(&out, CODE_POSTAL)?.context("postal code column")?;
    let sub: Int16Array = codes
        .iter()
        .map(|v| v.and_then(|c| c[c.len() - 2..].parse::<i16>().ok()))
        .collect();
    table::with_column(&out, ARRONDISSEMENT, Arc::new(sub))
}

/// 6. €/m²; division by zero or overflow gives null.
pub fn price_per_area(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let (Some(value), Some(area)) = (
        float_column(&batch, VALEUR_FONCIERE)?,
        float_column(&batch, SURFACE_BATI)?,
    ) else {
        return Ok(batch);
    };
    let price: Float64Array = value
        .iter()
        .zip(area.iter())
        .map(|(v, a)| match (v, a) {
            (Some(v), Some(a)) => Some(v / a).filter(|p| p.is_finite()),
            _ => None,
        })
        .collect();
    table::with_column(&batch, PRIX_M2, Arc::new(price))
}

fn keep_within(
    batch: &RecordBatch,
    values: &Float64Array,
    low: f64,
    high: f64,
) -> Result<RecordBatch> {
    let keep: BooleanArray = values
        .iter()
        .map(|v| Some(v.is_some_and(|x| x >= low && x <= high)))
        .collect();
    table::filter(batch, &keep)
}

/// 7. Habitable minimum, then cut above the top quantile of what is left.
pub fn censor_area(batch: RecordBatch, cfg: &CleanConfig) -> Result<RecordBatch> {
    let Some(area) = float_column(&batch, SURFACE_BATI)? else {
        return Ok(batch);
    };
    let out = keep_within(&batch, &area, cfg.min_surface, f64::INFINITY)?;

    let area = float_column(&out, SURFACE_BATI)?.context("area column")?;
    match quantile(&area, cfg.surface_quantile) {
        Some(top) => {
            debug!(top, "area cutoff");
            keep_within(&out, &area, f64::NEG_INFINITY, top)
        }
        None => Ok(out),
    }
}

/// Accepted €/m² band: the data quantiles, clamped into the fixed bounds.
pub fn price_band(prices: &Float64Array, cfg: &CleanConfig) -> (f64, f64) {
    let low = quantile(prices, cfg.price_low_quantile)
        .map(|q| q.max(cfg.min_price_m2))
        .unwrap_or(cfg.min_price_m2);
    let high = quantile(prices, cfg.price_high_quantile)
        .map(|q| q.min(cfg.max_price_m2))
        .unwrap_or(cfg.max_price_m2);
    (low, high)
}

/// 8. Drop €/m² outside the plausibility band (inclusive).
pub fn censor_price(batch: RecordBatch, cfg: &CleanConfig) -> Result<RecordBatch> {
    let Some(price) = float_column(&batch, PRIX_M2)? else {
        return Ok(batch);
    };
    let (low, high) = price_band(&price, cfg);
    debug!(low, high, "price band");
    keep_within(&batch, &price, low, high)
}

/// 9. Year and calendar quarter of the transaction.
pub fn temporal(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let Some(dates) = date_column(&batch) else {
        return Ok(batch);
    };
    let quarters: StringArray = dates
        .iter()
        .map(|d| d.and_then(days_to_date).map(quarter_label))
        .collect();
    let out = table::with_column(&batch, ANNEE, Arc::new(year_array(&dates)))?;
    table::with_column(&out, TRIMESTRE, Arc::new(quarters))
}

/// 10. Integer room counts, room classes and area classes.
pub fn bucket(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let mut out = batch;

    if let Some(rooms) = float_column(&out, NOMBRE_PIECES)? {
        let rounded: Int16Array = rooms
            .iter()
            .map(|v| v.and_then(bucket::round_rooms))
            .collect();
        let classes: StringArray = rounded
            .iter()
            .map(|r| r.and_then(bucket::room_class))
            .collect();
        out = table::with_column(&out, NOMBRE_PIECES, Arc::new(rounded))?;
        out = table::with_column(&out, CLASSE_PIECES, Arc::new(classes))?;
    }

    if let Some(area) = float_column(&out, SURFACE_BATI)? {
        let classes: StringArray = area
            .iter()
            .map(|v| v.and_then(bucket::surface_class))
            .collect();
        out = table::with_column(&out, CLASSE_SURFACE, Arc::new(classes))?;
    }
    Ok(out)
}

/// 11. Final schema, ordered by date (missing last).
pub fn project(batch: RecordBatch, _cfg: &CleanConfig) -> Result<RecordBatch> {
    let projected = table::select(&batch, &FINAL_CLEAN_COLUMNS)?;
    table::sort_nulls_last(&projected, DATE_MUTATION)
}
