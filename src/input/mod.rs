//! # Input validation
//!
//! Turns a [`RawTable`] of textual cells into a [`DataMatrix`]: a rectangular,
//! fully numeric `n × d` matrix with at least two observations and two features.
//! Every cell must be a finite real number; integers and floats are both accepted.

use crate::error::{Dimension, ReduceError, Result};
use log::info;
use ndarray::{Array2, ArrayView2};

/// Smallest accepted number of rows and of columns.
pub const MIN_DIMENSION: usize = 2;

/// Rows of cells exactly as they came out of a source, without any type guarantee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        RawTable { rows }
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: ToString,
    {
        RawTable {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// Width of the first row, `0` for an empty table.
    pub fn ncols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Vec<f64>>> for RawTable {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        RawTable::from_rows(rows)
    }
}

/// A validated `n × d` matrix of finite floats, observations in rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    values: Array2<f64>,
}

impl DataMatrix {
    /// Wraps an already numeric array, enforcing the same shape and finiteness
    /// rules as [`validate`].
    pub fn from_array(values: Array2<f64>) -> Result<Self> {
        check_shape(values.nrows(), values.ncols())?;
        if let Some(((row, column), value)) = values.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(ReduceError::NonNumericValue {
                row,
                column,
                value: value.to_string(),
            });
        }
        Ok(DataMatrix { values })
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }
}

/// Validates a raw table and materializes it as a [`DataMatrix`].
///
/// Checks run in a fixed order: rectangular shape, column count, row count,
/// then cell contents. The first violated constraint is reported.
pub fn validate(table: &RawTable) -> Result<DataMatrix> {
    if table.is_empty() {
        return Err(ReduceError::unreadable("no rows found"));
    }

    let n_cols = table.ncols();
    if let Some((row, cells)) = table
        .rows()
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != n_cols)
    {
        return Err(ReduceError::unreadable(format!(
            "row {} has {} fields, expected {}",
            row,
            cells.len(),
            n_cols
        )));
    }

    check_shape(table.nrows(), n_cols)?;

    let mut values = Vec::with_capacity(table.nrows() * n_cols);
    for (row, cells) in table.rows().iter().enumerate() {
        for (column, cell) in cells.iter().enumerate() {
            values.push(parse_cell(cell).ok_or_else(|| ReduceError::NonNumericValue {
                row,
                column,
                value: cell.clone(),
            })?);
        }
    }

    let values = Array2::from_shape_vec((table.nrows(), n_cols), values)
        .map_err(ReduceError::unreadable)?;

    info!(
        "Input data shape: {} rows × {} columns",
        values.nrows(),
        values.ncols()
    );

    Ok(DataMatrix { values })
}

fn check_shape(n_rows: usize, n_cols: usize) -> Result<()> {
    if n_cols < MIN_DIMENSION {
        return Err(ReduceError::ShapeTooSmall {
            dimension: Dimension::Columns,
            required: MIN_DIMENSION,
            found: n_cols,
        });
    }
    if n_rows < MIN_DIMENSION {
        return Err(ReduceError::ShapeTooSmall {
            dimension: Dimension::Rows,
            required: MIN_DIMENSION,
            found: n_rows,
        });
    }
    Ok(())
}

// Rejects empty cells, text, complex literals, NaN and infinities.
fn parse_cell(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
