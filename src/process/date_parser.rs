use arrow::{
    array::{Array, ArrayRef, AsArray, Date32Array, Int16Array},
    datatypes::DataType,
};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

use crate::process::utils::clean_str;

/// Days from 0001-01-01 (CE) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parse a transaction date. Accepts ISO, slashed and French day-first
/// layouts, with or without a trailing time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = clean_str(raw);
    // "2021-03-04 00:00:00" / "2021-03-04T00:00:00"
    let day_part = match s.find(|c: char| c == ' ' || c == 'T') {
        Some(idx) => &s[..idx],
        None => s,
    };
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day_part, fmt).ok())
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

/// Text column → Date32; already-typed Date32 is passed through.
pub fn parse_date_array(arr: &ArrayRef) -> ArrayRef {
    match arr.data_type() {
        DataType::Date32 => arr.clone(),
        DataType::Utf8 => {
            let out: Date32Array = arr
                .as_string::<i32>()
                .iter()
                .map(|v| v.and_then(parse_date).map(date_to_days))
                .collect();
            Arc::new(out)
        }
        _ => Arc::new(Date32Array::new_null(arr.len())),
    }
}

pub fn year_array(dates: &Date32Array) -> Int16Array {
    dates
        .iter()
        .map(|d| {
            d.and_then(days_to_date)
                .and_then(|d| i16::try_from(d.year()).ok())
        })
        .collect()
}

/// Calendar quarter label, e.g. "2021Q3".
pub fn quarter_label(date: NaiveDate) -> String {
    format!("{}Q{}", date.year(), (date.month0() / 3) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::StringArray;

    #[test]
    fn parses_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4);
        assert_eq!(parse_date("2021-03-04"), expected);
        assert_eq!(parse_date("2021/03/04"), expected);
        assert_eq!(parse_date("04/03/2021"), expected);
        assert_eq!(parse_date(" 2021-03-04 00:00:00"), expected);
        assert_eq!(parse_date("2021-03-04T12:30:00"), expected);
        assert_eq!(parse_date("2021-13-04"), None);
        assert_eq!(parse_date("hier"), None);
    }

    #[test]
    fn epoch_conversion() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);
        let d = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        assert_eq!(days_to_date(date_to_days(d)), Some(d));
    }

    #[test]
    fn date_column_and_year() {
        let raw: ArrayRef = Arc::new(StringArray::from(vec![
            Some("2020-01-02"),
            Some("pas une date"),
            None,
        ]));
        let dates = parse_date_array(&raw);
        let dates = dates.as_primitive::<arrow::datatypes::Date32Type>();
        assert!(dates.is_valid(0));
        assert!(dates.is_null(1));
        assert!(dates.is_null(2));

        let years = year_array(dates);
        assert_eq!(years.value(0), 2020);
        assert!(years.is_null(1));
    }

    #[test]
    fn quarter_labels() {
        let d = NaiveDate::from_ymd_opt(2021, 9, 30).unwrap();
        assert_eq!(quarter_label(d), "2021Q3");
        let d = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        assert_eq!(quarter_label(d), "2022Q1");
    }
}
