//! Small RecordBatch helpers shared by ingestion, cleaning and reporting.

use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, StringArray, UInt32Array},
    compute::{self, cast, SortOptions},
    datatypes::{DataType, Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
    row::{RowConverter, SortField},
};
use std::{collections::HashSet, sync::Arc};

pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a ArrayRef> {
    batch
        .schema_ref()
        .index_of(name)
        .ok()
        .map(|idx| batch.column(idx))
}

pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.schema_ref().index_of(name).is_ok()
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Owned Utf8 view of any column (casting non-text columns).
pub fn utf8_column(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>> {
    match column(batch, name) {
        None => Ok(None),
        Some(arr) if arr.data_type() == &DataType::Utf8 => Ok(Some(arr.as_string::<i32>().clone())),
        Some(arr) => {
            let casted = cast(arr, &DataType::Utf8)
                .with_context(|| format!("casting `{}` to Utf8", name))?;
            Ok(Some(casted.as_string::<i32>().clone()))
        }
    }
}

/// Replace `name` if present, otherwise append it as the last column.
pub fn with_column(batch: &RecordBatch, name: &str, values: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema_ref();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    let field = Field::new(name, values.data_type().clone(), true);

    match schema.index_of(name) {
        Ok(idx) => {
            fields[idx] = field;
            columns[idx] = values;
        }
        Err(_) => {
            fields.push(field);
            columns.push(values);
        }
    }
    build(fields, columns, batch.num_rows())
}

/// Keep only the named columns that exist, in the given order.
pub fn select(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    let indices: Vec<usize> = names
        .iter()
        .filter_map(|n| batch.schema_ref().index_of(n).ok())
        .collect();
    batch.project(&indices).context("projecting columns")
}

pub fn filter(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if mask.len() != batch.num_rows() {
        return Err(anyhow!(
            "filter mask has {} entries for {} rows",
            mask.len(),
            batch.num_rows()
        ));
    }
    let kept = mask.iter().filter(|m| *m == Some(true)).count();
    let columns = batch
        .columns()
        .iter()
        .map(|c| compute::filter(c.as_ref(), mask))
        .collect::<Result<Vec<_>, _>>()
        .context("filtering rows")?;
    let fields = batch.schema_ref().fields().iter().map(|f| f.as_ref().clone()).collect();
    build(fields, columns, kept)
}

pub fn take(batch: &RecordBatch, indices: &[u32]) -> Result<RecordBatch> {
    let idx = UInt32Array::from(indices.to_vec());
    let columns = batch
        .columns()
        .iter()
        .map(|c| compute::take(c.as_ref(), &idx, None))
        .collect::<Result<Vec<_>, _>>()
        .context("taking rows")?;
    let fields = batch.schema_ref().fields().iter().map(|f| f.as_ref().clone()).collect();
    build(fields, columns, indices.len())
}

/// Stable ascending sort on one column, nulls last.
pub fn sort_nulls_last(batch: &RecordBatch, name: &str) -> Result<RecordBatch> {
    let Some(col) = column(batch, name) else {
        return Ok(batch.clone());
    };
    let options = SortOptions {
        descending: false,
        nulls_first: false,
    };
    let converter =
        RowConverter::new(vec![SortField::new_with_options(col.data_type().clone(), options)])
            .context("building row converter for sort")?;
    let rows = converter
        .convert_columns(&[col.clone()])
        .context("encoding sort column")?;

    let mut order: Vec<u32> = (0..batch.num_rows() as u32).collect();
    order.sort_by(|a, b| rows.row(*a as usize).cmp(&rows.row(*b as usize)));
    take(batch, &order)
}

/// Mask keeping the first occurrence of every distinct key tuple. Nulls
/// compare equal to each other. No key columns means every row is kept.
pub fn first_occurrence_mask(keys: &[ArrayRef], num_rows: usize) -> Result<BooleanArray> {
    if keys.is_empty() {
        return Ok(BooleanArray::from(vec![true; num_rows]));
    }
    let fields = keys
        .iter()
        .map(|k| SortField::new(k.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields).context("building row converter for keys")?;
    let rows = converter.convert_columns(keys).context("encoding key columns")?;

    let mut seen = HashSet::with_capacity(num_rows);
    let mask: Vec<bool> = (0..num_rows).map(|i| seen.insert(rows.row(i))).collect();
    Ok(BooleanArray::from(mask))
}

fn build(fields: Vec<Field>, columns: Vec<ArrayRef>, num_rows: usize) -> Result<RecordBatch> {
    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)
        .context("assembling record batch")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use arrow::array::{Date32Array, Float64Array};

    pub(crate) fn batch(cols: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let num_rows = cols.first().map(|(_, c)| c.len()).unwrap_or(0);
        let fields = cols
            .iter()
            .map(|(n, c)| Field::new(*n, c.data_type().clone(), true))
            .collect();
        let columns = cols.into_iter().map(|(_, c)| c).collect();
        build(fields, columns, num_rows).unwrap()
    }

    pub(crate) fn text(values: &[Option<&str>]) -> ArrayRef {
        Arc::new(StringArray::from(values.to_vec()))
    }

    #[test]
    fn sort_is_stable_with_nulls_last() -> Result<()> {
        let b = batch(vec![
            ("d", Arc::new(Date32Array::from(vec![Some(5), None, Some(1), Some(5)])) as ArrayRef),
            ("tag", text(&[Some("a"), Some("b"), Some("c"), Some("d")])),
        ]);
        let sorted = sort_nulls_last(&b, "d")?;
        let tags = utf8_column(&sorted, "tag")?.unwrap();
        let tags: Vec<_> = tags.iter().map(|t| t.unwrap()).collect();
        assert_eq!(tags, vec!["c", "a", "d", "b"]);
        Ok(())
    }

    #[test]
    fn first_occurrence_treats_nulls_as_equal() -> Result<()> {
        let k = text(&[Some("x"), None, Some("x"), None, Some("y")]);
        let mask = first_occurrence_mask(&[k], 5)?;
        let got: Vec<bool> = mask.iter().map(|m| m.unwrap()).collect();
        assert_eq!(got, vec![true, true, false, false, true]);
        Ok(())
    }

    #[test]
    fn with_column_replaces_and_appends() -> Result<()> {
        let b = batch(vec![("a", text(&[Some("1"), Some("2")]))]);
        let b = with_column(&b, "a", Arc::new(Float64Array::from(vec![1.0, 2.0])))?;
        let b = with_column(&b, "b", text(&[None, Some("z")]))?;
        assert_eq!(column_names(&b), vec!["a", "b"]);
        assert_eq!(column(&b, "a").unwrap().data_type(), &DataType::Float64);
        Ok(())
    }

    #[test]
    fn filter_and_select() -> Result<()> {
        let b = batch(vec![
            ("a", text(&[Some("1"), Some("2"), Some("3")])),
            ("b", text(&[Some("x"), Some("y"), Some("z")])),
        ]);
        let f = filter(&b, &BooleanArray::from(vec![true, false, true]))?;
        assert_eq!(f.num_rows(), 2);
        let s = select(&f, &["b", "missing", "a"])?;
        assert_eq!(column_names(&s), vec!["b", "a"]);
        Ok(())
    }
}
