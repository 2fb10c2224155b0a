//! Feature table storage (Arrow/Parquet)
//!
//! Column layout of the persisted table:
//!
//! ```text
//! contrast_left | contrast_right | total_spikes.<area>... | early_rate.<area>...
//!               | late_rate.<area>... | feedback (Int8, +1/-1) | session_id (UInt32)
//! ```
//!
//! Feature columns are `Float64` (NaN marks a missing area under
//! [`FillPolicy::Missing`](crate::features::FillPolicy::Missing)). The area
//! vocabulary is recovered from the column names, so a table with zero rows
//! still carries its layout. The table is append-only.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int8Array, RecordBatch, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::features::{AreaFeature, FeatureSchema, FeatureVector, CONTRAST_LEFT, CONTRAST_RIGHT};
use crate::session::Feedback;
use crate::vocabulary::AreaVocabulary;
use crate::{Error, Result};

/// Label column name.
pub const FEEDBACK_COLUMN: &str = "feedback";
/// Session identifier column name.
pub const SESSION_ID_COLUMN: &str = "session_id";

/// Arrow-backed feature table with a known area vocabulary.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    vocabulary: AreaVocabulary,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

/// Arrow schema for a feature layout.
#[must_use]
pub fn arrow_schema(schema: &FeatureSchema) -> SchemaRef {
    let mut fields: Vec<Field> = schema
        .names()
        .iter()
        .map(|name| Field::new(name, DataType::Float64, false))
        .collect();
    fields.push(Field::new(FEEDBACK_COLUMN, DataType::Int8, false));
    fields.push(Field::new(SESSION_ID_COLUMN, DataType::UInt32, false));
    Arc::new(Schema::new(fields))
}

impl FeatureTable {
    /// Empty table laid out for `vocabulary`.
    #[must_use]
    pub fn empty(vocabulary: AreaVocabulary) -> Self {
        let schema = arrow_schema(&FeatureSchema::new(&vocabulary));
        Self {
            vocabulary,
            schema,
            batches: Vec::new(),
        }
    }

    /// Wrap record batches, recovering the vocabulary from the first
    /// batch's column names.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageError` if `batches` is empty, the columns do
    /// not follow the feature-table layout, or batches disagree on schema.
    pub fn from_batches(batches: Vec<RecordBatch>) -> Result<Self> {
        let first = batches.first().ok_or_else(|| {
            Error::StorageError("Cannot infer a feature layout from zero batches".to_string())
        })?;
        let mut table = Self::empty(vocabulary_from_schema(&first.schema())?);
        for batch in batches {
            table.append_batch(batch)?;
        }
        Ok(table)
    }

    /// Convert a dataset into a single record batch.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the columns.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let mut table = Self::empty(dataset.vocabulary().clone());
        let rows = dataset.rows();

        let mut columns: Vec<ArrayRef> = (0..dataset.schema().width())
            .map(|c| {
                Arc::new(Float64Array::from_iter_values(
                    rows.iter().map(|r| r.values()[c]),
                )) as ArrayRef
            })
            .collect();
        columns.push(Arc::new(Int8Array::from_iter_values(
            rows.iter().map(|r| r.feedback().feedback_type()),
        )));
        columns.push(Arc::new(UInt32Array::from_iter_values(
            rows.iter().map(FeatureVector::session_id),
        )));

        table
            .batches
            .push(RecordBatch::try_new(table.schema.clone(), columns)?);
        Ok(table)
    }

    /// Load a feature table from a Parquet file.
    ///
    /// The layout is checked against the file's Arrow schema before any row
    /// is decoded, so a zero-row file still yields its vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageError` if the file cannot be read or its
    /// columns do not follow the feature-table layout.
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::fs::File;

        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::StorageError(format!("Failed to open feature table {}: {e}", path.display()))
        })?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse feature table {}: {e}", path.display()))
        })?;

        let mut table = Self::empty(vocabulary_from_schema(builder.schema())?);
        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            table.append_batch(batch)?;
        }

        debug!(
            path = %path.display(),
            rows = table.num_rows(),
            areas = table.vocabulary.len(),
            "Feature table loaded"
        );
        Ok(table)
    }

    /// Write the table to a Parquet file; a table without rows still
    /// writes its schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageError` if the file cannot be written.
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use parquet::arrow::ArrowWriter;
        use std::fs::File;

        let file = File::create(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet file: {e}"))
        })?;
        let mut writer = ArrowWriter::try_new(file, self.schema.clone(), None).map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet writer: {e}"))
        })?;
        for batch in &self.batches {
            writer.write(batch).map_err(|e| {
                Error::StorageError(format!("Failed to write record batch: {e}"))
            })?;
        }
        writer.close().map_err(|e| {
            Error::StorageError(format!("Failed to finish Parquet file: {e}"))
        })?;

        info!(
            path = %path.as_ref().display(),
            rows = self.num_rows(),
            "Feature table written"
        );
        Ok(())
    }

    /// Area vocabulary the columns are keyed to.
    #[must_use]
    pub const fn vocabulary(&self) -> &AreaVocabulary {
        &self.vocabulary
    }

    /// Arrow schema shared by every batch.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Get all record batches
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total rows across batches.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Append a batch; the table is append-only.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageError` if the batch columns differ from the
    /// table layout in name or type.
    pub fn append_batch(&mut self, batch: RecordBatch) -> Result<()> {
        let expected = self.schema.fields();
        let found = batch.schema();
        if found.fields().len() != expected.len() {
            return Err(Error::StorageError(format!(
                "Schema mismatch: table has {} columns, batch has {}",
                expected.len(),
                found.fields().len()
            )));
        }
        for (want, got) in expected.iter().zip(found.fields()) {
            if want.name() != got.name() {
                return Err(Error::StorageError(format!(
                    "Schema mismatch: expected column '{}', found '{}'",
                    want.name(),
                    got.name()
                )));
            }
            if want.data_type() != got.data_type() {
                return Err(Error::StorageError(format!(
                    "Column '{}' has unexpected type {:?}, expected {:?}",
                    got.name(),
                    got.data_type(),
                    want.data_type()
                )));
            }
        }
        self.batches.push(batch);
        Ok(())
    }

    /// Rebuild the dataset.
    ///
    /// Trial indices are renumbered per session in row order.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageError` if a label is not ±1.
    pub fn to_dataset(&self) -> Result<Dataset> {
        let width = FeatureSchema::width_for(self.vocabulary.len());
        let mut rows = Vec::with_capacity(self.num_rows());
        let mut next_trial: FxHashMap<u32, usize> = FxHashMap::default();

        for batch in &self.batches {
            let features = (0..width)
                .map(|c| column::<Float64Array>(batch, c))
                .collect::<Result<Vec<_>>>()?;
            let feedback = column::<Int8Array>(batch, width)?;
            let session = column::<UInt32Array>(batch, width + 1)?;

            for r in 0..batch.num_rows() {
                let label = Feedback::from_feedback_type(i64::from(feedback.value(r)))
                    .ok_or_else(|| {
                        Error::StorageError(format!(
                            "Row {r}: feedback {} is not +1 or -1",
                            feedback.value(r)
                        ))
                    })?;
                let session_id = session.value(r);
                let trial = next_trial.entry(session_id).or_insert(0);
                let values = features.iter().map(|col| col.value(r)).collect();
                rows.push(FeatureVector::new(session_id, *trial, label, values));
                *trial += 1;
            }
        }

        Dataset::new(self.vocabulary.clone(), rows)
    }
}

fn column<T: Array + 'static>(batch: &RecordBatch, index: usize) -> Result<&T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| {
            Error::StorageError(format!(
                "Column '{}' has unexpected type {:?}",
                batch.schema().field(index).name(),
                batch.column(index).data_type()
            ))
        })
}

fn vocabulary_from_schema(schema: &Schema) -> Result<AreaVocabulary> {
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let malformed = |reason: String| Error::StorageError(format!("Malformed feature table: {reason}"));

    if names.len() < 4 || (names.len() - 4) % 3 != 0 {
        return Err(malformed(format!("{} columns cannot hold 2 + 3k features plus labels", names.len())));
    }
    let areas = (names.len() - 4) / 3;

    let labels = names[2..2 + areas]
        .iter()
        .map(|name| match AreaFeature::parse_column(name) {
            Some((AreaFeature::TotalSpikes, area)) => Ok(area.to_string()),
            _ => Err(malformed(format!("expected a total_spikes column, found '{name}'"))),
        })
        .collect::<Result<Vec<_>>>()?;
    let vocabulary = AreaVocabulary::from_labels(labels);
    if vocabulary.len() != areas {
        return Err(malformed("duplicate area columns".to_string()));
    }

    let expected = FeatureSchema::new(&vocabulary);
    let layout_ok = expected.names().iter().zip(&names).all(|(e, n)| e == n)
        && names[expected.width()] == FEEDBACK_COLUMN
        && names[expected.width() + 1] == SESSION_ID_COLUMN;
    if !layout_ok || names[0] != CONTRAST_LEFT || names[1] != CONTRAST_RIGHT {
        return Err(malformed(format!("column order differs from {:?}", expected.names())));
    }
    Ok(vocabulary)
}
