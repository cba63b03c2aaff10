use anyhow::{Context, Result};
use arrow::{compute::concat_batches, record_batch::RecordBatch};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

const READ_BATCH_SIZE: usize = 8192;

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `batch` as one parquet file: `<path>.tmp` first, then renamed over
/// `path`. Returns the size on disk.
pub fn write_snapshot(batch: &RecordBatch, path: &Path) -> Result<u64> {
    let tmp = tmp_path(path);
    let file = File::create(&tmp)
        .with_context(|| format!("could not create `{}`", tmp.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    fs::rename(&tmp, path).with_context(|| {
        format!("renaming `{}` → `{}`", tmp.display(), path.display())
    })?;
    Ok(fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .len())
}

/// Read a snapshot back into a single batch with its stored schema.
pub fn read_snapshot(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of `{}`", path.display()))?;
    let schema = builder.schema().clone();
    let reader = builder
        .with_batch_size(READ_BATCH_SIZE)
        .build()
        .with_context(|| format!("building reader for `{}`", path.display()))?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("reading batches from `{}`", path.display()))?;
    concat_batches(&schema, &batches).context("concatenating snapshot batches")
}

/// Pretty JSON with a trailing newline, written through a tmp file.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let tmp = tmp_path(path);
    let mut out = File::create(&tmp)
        .with_context(|| format!("creating {}", tmp.display()))?;
    serde_json::to_writer_pretty(&mut out, value).context("serializing JSON")?;
    out.write_all(b"\n")?;
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{batch, text};
    use arrow::array::{ArrayRef, Date32Array, Float64Array, Int16Array};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn snapshot_round_trip_keeps_types() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.parquet");
        let b = batch(vec![
            ("id", text(&[Some("a"), None])),
            ("d", Arc::new(Date32Array::from(vec![Some(18_000), None])) as ArrayRef),
            ("y", Arc::new(Int16Array::from(vec![Some(2020), None])) as ArrayRef),
            ("v", Arc::new(Float64Array::from(vec![Some(1.5), None])) as ArrayRef),
        ]);
        let size = write_snapshot(&b, &path)?;
        assert!(size > 0);
        assert!(!tmp_path(&path).exists());

        let back = read_snapshot(&path)?;
        assert_eq!(back.schema(), b.schema());
        assert_eq!(back, b);
        Ok(())
    }

    #[test]
    fn json_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("m.json");
        write_json(&vec![1, 2, 3], &path)?;
        let back: Vec<i32> = read_json(&path)?;
        assert_eq!(back, vec![1, 2, 3]);
        Ok(())
    }
}
