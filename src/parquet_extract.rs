// src/parquet_extract.rs
//
// Columnar payload extractor: decode a downloaded Parquet file, pull binary
// payloads out of the designated structured column, and land each one as an
// image file plus a metadata record. One metadata CSV per source file.
//
// The source files are modest batch exports, so the whole row set is decoded
// in record batches rather than streamed row by row.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{
    Array, ArrayRef, BinaryArray, LargeBinaryArray, LargeStringArray, StringArray, StructArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{IMAGE_EXTENSION, TITLE_SENTINEL};
use crate::error::HarvestError;

/// A materialized binary payload. Never deleted by this pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub row_index: usize,
    pub sub_key: String,
    pub local_path: PathBuf,
}

/// One metadata row per extracted image; field order is the CSV header order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetadataRecord {
    pub row_index: usize,
    pub sub_key: String,
    pub title: String,
    pub image_path: String,
}

/// Everything one source file produced.
#[derive(Debug)]
pub struct Extraction {
    pub images: Vec<ExtractedImage>,
    pub records: Vec<MetadataRecord>,
    /// Rows that yielded no payload: designated column absent, not a
    /// mapping, or mapping without a binary sub-value.
    pub skipped_rows: usize,
    /// Where the metadata CSV landed; `None` when no payload was found.
    pub metadata_path: Option<PathBuf>,
}

/// Per-row content of the designated column, decided once at read time.
enum ColumnValue {
    /// Column missing from the schema, or null in this row.
    Absent,
    /// Present but not a mapping; carries the actual type for the log line.
    Scalar(DataType),
    /// Mapping from sub-key to sub-value.
    Nested(Vec<(String, SubValue)>),
}

enum SubValue {
    Binary(Vec<u8>),
    Text(String),
    Other,
}

/// Decode `parquet_path`, landing images and one metadata CSV in
/// `output_dir`. Image names are `{stem}_{row_index}_{sub_key}.png`, unique
/// by construction even when several source files share the directory.
pub fn extract(
    parquet_path: &Path,
    output_dir: &Path,
    image_column: &str,
    title_column: &str,
) -> Result<Extraction, HarvestError> {
    let fail = |reason: String| HarvestError::DecodeFailed {
        file: parquet_path.to_path_buf(),
        reason,
    };

    let stem = parquet_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| fail("no file stem".to_string()))?;

    std::fs::create_dir_all(output_dir)
        .map_err(|e| fail(format!("mkdir {}: {e}", output_dir.display())))?;

    let file = File::open(parquet_path).map_err(|e| fail(e.to_string()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| fail(e.to_string()))?
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let mut out = Extraction {
        images: Vec::new(),
        records: Vec::new(),
        skipped_rows: 0,
        metadata_path: None,
    };

    let mut row_base = 0usize;
    for batch in reader {
        let batch = batch.map_err(|e| fail(e.to_string()))?;
        for row in 0..batch.num_rows() {
            let row_index = row_base + row;
            let produced = match column_value(&batch, image_column, row) {
                ColumnValue::Absent => {
                    debug!("row {row_index}: column '{image_column}' absent");
                    0
                }
                ColumnValue::Scalar(dt) => {
                    debug!("row {row_index}: column '{image_column}' is {dt}, not a mapping");
                    0
                }
                ColumnValue::Nested(subs) => {
                    let title = row_title(&batch, title_column, row);
                    let mut produced = 0;
                    for (sub_key, value) in subs {
                        match value {
                            SubValue::Binary(bytes) => {
                                let name =
                                    format!("{stem}_{row_index}_{sub_key}.{IMAGE_EXTENSION}");
                                let image_path = output_dir.join(&name);
                                if let Err(e) = std::fs::write(&image_path, &bytes) {
                                    warn!("row {row_index}: writing {name}: {e}");
                                    continue;
                                }
                                out.records.push(MetadataRecord {
                                    row_index,
                                    sub_key: sub_key.clone(),
                                    title: title.clone(),
                                    image_path: image_path.to_string_lossy().into_owned(),
                                });
                                out.images.push(ExtractedImage {
                                    row_index,
                                    sub_key,
                                    local_path: image_path,
                                });
                                produced += 1;
                            }
                            SubValue::Text(_) | SubValue::Other => {
                                debug!("row {row_index}: sub-key '{sub_key}' holds no binary payload");
                            }
                        }
                    }
                    produced
                }
            };
            if produced == 0 {
                out.skipped_rows += 1;
            }
        }
        row_base += batch.num_rows();
    }

    if !out.records.is_empty() {
        let csv_path = output_dir.join(format!("{stem}_metadata.csv"));
        write_metadata(&csv_path, &out.records).map_err(|e| fail(e))?;
        out.metadata_path = Some(csv_path);
    }

    Ok(out)
}

fn write_metadata(path: &Path, records: &[MetadataRecord]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    for record in records {
        writer.serialize(record).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

/// Classify the designated column for one row.
fn column_value(batch: &RecordBatch, column: &str, row: usize) -> ColumnValue {
    let Some(col) = batch.column_by_name(column) else {
        return ColumnValue::Absent;
    };
    if col.is_null(row) {
        return ColumnValue::Absent;
    }
    let Some(nested) = col.as_any().downcast_ref::<StructArray>() else {
        return ColumnValue::Scalar(col.data_type().clone());
    };

    let mut subs = Vec::with_capacity(nested.num_columns());
    for (field, child) in nested.fields().iter().zip(nested.columns()) {
        if child.is_null(row) {
            continue;
        }
        subs.push((field.name().clone(), sub_value(child, row)));
    }
    ColumnValue::Nested(subs)
}

fn sub_value(child: &ArrayRef, row: usize) -> SubValue {
    if let Some(a) = child.as_any().downcast_ref::<BinaryArray>() {
        SubValue::Binary(a.value(row).to_vec())
    } else if let Some(a) = child.as_any().downcast_ref::<LargeBinaryArray>() {
        SubValue::Binary(a.value(row).to_vec())
    } else if let Some(a) = child.as_any().downcast_ref::<StringArray>() {
        SubValue::Text(a.value(row).to_string())
    } else if let Some(a) = child.as_any().downcast_ref::<LargeStringArray>() {
        SubValue::Text(a.value(row).to_string())
    } else {
        SubValue::Other
    }
}

/// Title scalar for one row, with the sentinel when absent or null.
fn row_title(batch: &RecordBatch, column: &str, row: usize) -> String {
    let Some(col) = batch.column_by_name(column) else {
        return TITLE_SENTINEL.to_string();
    };
    if col.is_null(row) {
        return TITLE_SENTINEL.to_string();
    }
    if let Some(a) = col.as_any().downcast_ref::<StringArray>() {
        a.value(row).to_string()
    } else if let Some(a) = col.as_any().downcast_ref::<LargeStringArray>() {
        a.value(row).to_string()
    } else {
        TITLE_SENTINEL.to_string()
    }
}
