use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{new_null_array, ArrayRef},
    compute::{cast, concat_batches},
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::warn;

use crate::table;

/// Stack batches with different column sets. The union keeps first-seen
/// column order and first-seen type; absent columns become nulls.
pub fn concat_union(batches: &[RecordBatch]) -> Result<RecordBatch> {
    if batches.is_empty() {
        return Err(anyhow!("nothing to concatenate"));
    }

    let mut fields: Vec<Field> = Vec::new();
    for batch in batches {
        for f in batch.schema_ref().fields() {
            if !fields.iter().any(|u| u.name() == f.name()) {
                fields.push(Field::new(f.name(), f.data_type().clone(), true));
            }
        }
    }
    let schema = Arc::new(Schema::new(fields));

    let mut aligned = Vec::with_capacity(batches.len());
    for batch in batches {
        let columns = schema
            .fields()
            .iter()
            .map(|f| match table::column(batch, f.name()) {
                Some(col) if col.data_type() == f.data_type() => Ok(col.clone()),
                Some(col) => {
                    warn!(
                        column = %f.name(),
                        from = ?col.data_type(),
                        to = ?f.data_type(),
                        "type mismatch across files, casting"
                    );
                    cast(col, f.data_type())
                        .with_context(|| format!("casting column `{}`", f.name()))
                }
                None => Ok(new_null_array(f.data_type(), batch.num_rows())),
            })
            .collect::<Result<Vec<ArrayRef>>>()?;
        aligned.push(RecordBatch::try_new(schema.clone(), columns).context("aligning batch")?);
    }

    concat_batches(&schema, &aligned).context("concatenating batches")
}

/// Move `preferred` columns (those present) to the front, keep the rest in
/// their current order.
pub fn reorder_preferred(batch: &RecordBatch, preferred: &[&str]) -> Result<RecordBatch> {
    let names = table::column_names(batch);
    let mut order: Vec<&str> = preferred
        .iter()
        .copied()
        .filter(|p| names.iter().any(|n| n == p))
        .collect();
    order.extend(
        names
            .iter()
            .map(String::as_str)
            .filter(|n| !preferred.contains(n)),
    );
    table::select(batch, &order)
}
