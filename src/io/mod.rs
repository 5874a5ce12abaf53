//! Table I/O: where raw tables come from and where reduced coordinates go.
//!
//! ```text
//!  headerless CSV ──► CsvSource ──► RawTable ──► pipeline ──► CsvSink ──► headerless CSV
//!                                     ▲                          │
//!                      in-memory RawTable              MemorySink (library use)
//! ```
use crate::error::{ReduceError, Result};
use crate::input::RawTable;
use log::debug;
use ndarray::{Array2, ArrayView2};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DELIMITER: u8 = b',';

const PLAIN_MIN: f64 = 1e-5;
const PLAIN_MAX: f64 = 1e16;

/// Anything that can hand over a [`RawTable`].
pub trait TableSource {
    fn read_table(&self) -> Result<RawTable>;

    fn describe(&self) -> String;
}

/// Anything that can receive the final `n × k` coordinates.
pub trait TableSink {
    /// Stores the table. Implementations must not leave a partial artifact behind on error.
    fn write_table(&mut self, table: ArrayView2<f64>) -> Result<()>;

    fn describe(&self) -> String;
}

impl TableSource for RawTable {
    fn read_table(&self) -> Result<RawTable> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        "in-memory table".to_string()
    }
}

/// Headerless delimited text file, one observation per line.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSource {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvSource {
    fn read_table(&self) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter)
            .from_path(&self.path)
            .map_err(|e| ReduceError::unreadable(format!("{}: {}", self.path.display(), e)))?;

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                ReduceError::unreadable(format!("{} record {}: {}", self.path.display(), line, e))
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!("Read {} records from {}", rows.len(), self.path.display());
        Ok(RawTable::new(rows))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Headerless delimited text file writer.
///
/// Rows are written to a hidden sibling file which is renamed over the target
/// only once everything has been flushed.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSink {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.path
            .with_file_name(format!(".{}.{}.partial", file_name, std::process::id()))
    }

    fn unwritable(&self, reason: impl std::fmt::Display) -> ReduceError {
        ReduceError::SinkUnwritable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn write_staged(&self, staging: &Path, table: ArrayView2<f64>) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .from_path(staging)
            .map_err(|e| self.unwritable(e))?;

        for row in table.rows() {
            writer
                .write_record(row.iter().map(|&v| format_value(v)))
                .map_err(|e| self.unwritable(e))?;
        }
        writer.flush().map_err(|e| self.unwritable(e))?;
        drop(writer);

        fs::rename(staging, &self.path).map_err(|e| self.unwritable(e))
    }
}

impl TableSink for CsvSink {
    fn write_table(&mut self, table: ArrayView2<f64>) -> Result<()> {
        let staging = self.staging_path();
        let written = self.write_staged(&staging, table);
        if written.is_err() {
            let _ = fs::remove_file(&staging);
        }
        written
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Plain decimal for ordinary magnitudes, shortest exponent form otherwise.
fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(PLAIN_MIN..PLAIN_MAX).contains(&magnitude) {
        format!("{value:e}")
    } else {
        value.to_string()
    }
}

/// Keeps the coordinates in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    table: Option<Array2<f64>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> Option<&Array2<f64>> {
        self.table.as_ref()
    }

    pub fn into_table(self) -> Option<Array2<f64>> {
        self.table
    }
}

impl TableSink for MemorySink {
    fn write_table(&mut self, table: ArrayView2<f64>) -> Result<()> {
        self.table = Some(table.to_owned());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory sink".to_string()
    }
}
