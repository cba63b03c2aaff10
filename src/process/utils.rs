use anyhow::{Context, Result};
use arrow::{
    array::{new_null_array, Array, ArrayRef, AsArray, Float64Array},
    compute::cast,
    datatypes::DataType,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9A-Za-z]+").expect("static regex"));

/// Cell values read as missing, whatever the column.
const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

pub fn is_na_token(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

/// Turn an arbitrary header ("Valeur fonciere (€)") into a snake_case
/// identifier ("valeur_fonciere"). Idempotent.
pub fn normalize_header(raw: &str) -> String {
    let spaced: String = raw
        .trim()
        .chars()
        .map(|c| if matches!(c, '(' | ')' | '/') { ' ' } else { c })
        .collect();
    NON_ALNUM
        .replace_all(&spaced, "_")
        .trim_matches('_')
        .to_lowercase()
}

/// Parse a French-formatted number: NBSP / space thousand separators and a
/// decimal comma. Anything unparseable is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00A0}' | '\u{202F}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    compact.parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn coerce_numeric<'a, I>(values: I) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .map(|v| v.and_then(parse_number))
        .collect()
}

/// Column form of [`coerce_numeric`]: text becomes Float64, other numeric
/// types are cast.
pub fn coerce_numeric_array(arr: &ArrayRef) -> Result<ArrayRef> {
    match arr.data_type() {
        DataType::Float64 => Ok(arr.clone()),
        DataType::Null => Ok(new_null_array(&DataType::Float64, arr.len())),
        DataType::Utf8 => {
            let out: Float64Array = coerce_numeric(arr.as_string::<i32>().iter()).into();
            Ok(Arc::new(out))
        }
        DataType::LargeUtf8 => {
            let out: Float64Array = coerce_numeric(arr.as_string::<i64>().iter()).into();
            Ok(Arc::new(out))
        }
        other => cast(arr, &DataType::Float64)
            .with_context(|| format!("casting {:?} column to Float64", other)),
    }
}
