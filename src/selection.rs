//! Global filters applied to the clean table before it is charted.

use anyhow::Result;
use arrow::{
    array::{Array, AsArray, BooleanArray},
    datatypes::{DataType, Int16Type},
    record_batch::RecordBatch,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::clean::quantile::quantile;
use crate::columns::{ANNEE, ARRONDISSEMENT, SURFACE_BATI, TYPE_LOCAL};
use crate::process::utils::coerce_numeric_array;
use crate::table;

const SURFACE_FLOOR: f64 = 9.0;
const SURFACE_TOP_QUANTILE: f64 = 0.99;

/// Inclusive ranges; an empty list means "everything". A criterion whose
/// column is absent is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub years: Option<(i16, i16)>,
    pub types: Vec<String>,
    pub subregions: Vec<i16>,
    pub surface: Option<(f64, f64)>,
}

fn int16_column(batch: &RecordBatch, name: &str) -> Option<arrow::array::Int16Array> {
    table::column(batch, name)
        .filter(|c| c.data_type() == &DataType::Int16)
        .map(|c| c.as_primitive::<Int16Type>().clone())
}

fn and_mask(mask: &mut [bool], keep: impl Iterator<Item = bool>) {
    for (m, k) in mask.iter_mut().zip(keep) {
        *m &= k;
    }
}

impl Selection {
    /// The widest selection for `clean`: every year, type and sub-region
    /// present, and areas from `max(9, min)` up to the 99th percentile
    /// (both truncated to whole m²).
    pub fn defaults_for(clean: &RecordBatch) -> Result<Self> {
        let years = int16_column(clean, ANNEE).and_then(|y| {
            let min = y.iter().flatten().min()?;
            let max = y.iter().flatten().max()?;
            Some((min, max))
        });

        let types: Vec<String> = match table::utf8_column(clean, TYPE_LOCAL)? {
            Some(col) => col
                .iter()
                .flatten()
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            None => Vec::new(),
        };

        let subregions: Vec<i16> = int16_column(clean, ARRONDISSEMENT)
            .map(|a| a.iter().flatten().collect::<BTreeSet<_>>().into_iter().collect())
            .unwrap_or_default();

        let surface = match table::column(clean, SURFACE_BATI) {
            Some(col) => {
                let area = coerce_numeric_array(col)?;
                let area = area.as_primitive::<arrow::datatypes::Float64Type>();
                let min = area
                    .iter()
                    .flatten()
                    .filter(|v| !v.is_nan())
                    .min_by(f64::total_cmp);
                match (min, quantile(area, SURFACE_TOP_QUANTILE)) {
                    (Some(min), Some(top)) => {
                        Some((SURFACE_FLOOR.max(min.max(0.0).trunc()), top.trunc()))
                    }
                    _ => None,
                }
            }
            None => None,
        };

        Ok(Self {
            years,
            types,
            subregions,
            surface,
        })
    }

    pub fn apply(&self, clean: &RecordBatch) -> Result<RecordBatch> {
        let mut mask = vec![true; clean.num_rows()];

        if let (Some((lo, hi)), Some(years)) = (self.years, int16_column(clean, ANNEE)) {
            and_mask(
                &mut mask,
                years.iter().map(|y| y.is_some_and(|y| y >= lo && y <= hi)),
            );
        }

        if !self.types.is_empty() {
            if let Some(types) = table::utf8_column(clean, TYPE_LOCAL)? {
                and_mask(
                    &mut mask,
                    types
                        .iter()
                        .map(|t| t.is_some_and(|t| self.types.iter().any(|s| s == t))),
                );
            }
        }

        if !self.subregions.is_empty() {
            if let Some(sub) = int16_column(clean, ARRONDISSEMENT) {
                and_mask(
                    &mut mask,
                    sub.iter().map(|a| a.is_some_and(|a| self.subregions.contains(&a))),
                );
            }
        }

        if let (Some((lo, hi)), Some(col)) = (self.surface, table::column(clean, SURFACE_BATI)) {
            let area = coerce_numeric_array(col)?;
            and_mask(
                &mut mask,
                area.as_primitive::<arrow::datatypes::Float64Type>()
                    .iter()
                    .map(|v| v.is_some_and(|v| v >= lo && v <= hi)),
            );
        }

        table::filter(clean, &BooleanArray::from(mask))
    }
}
