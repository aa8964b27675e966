//! Coordinate-form sparse matrices and sparsity patterns.
//!
//! A constraint Jacobian has one row per constraint and one column per design
//! variable. Most constraints depend on few variables, so the Jacobian is
//! exchanged as `(row, column, value)` triples. The solver is told up front
//! which coordinates may be nonzero (the [`SparsityPattern`]) and afterwards
//! receives only the values, packed in pattern order.

use std::collections::HashMap;

use thiserror::Error;

/// Errors raised when matrix shapes or coordinates do not line up.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    #[error("entry ({row}, {col}) is outside a {nrows}x{ncols} matrix")]
    OutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },

    #[error("entry ({row}, {col}) appears more than once in the sparsity pattern")]
    DuplicateEntry { row: usize, col: usize },

    #[error("nonzero entry ({row}, {col}) = {value} is not in the declared sparsity pattern")]
    OutsidePattern { row: usize, col: usize, value: f64 },

    #[error("expected a {expected_rows}x{expected_cols} matrix, got {nrows}x{ncols}")]
    Dimensions {
        expected_rows: usize,
        expected_cols: usize,
        nrows: usize,
        ncols: usize,
    },

    #[error("expected {expected} values, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// A sparse matrix in coordinate (triplet) form.
///
/// Entries may repeat a coordinate; repeated values are summed when read.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSparseMatrix"))]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

/// The serialized form of a [`SparseMatrix`], checked on the way in.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSparseMatrix {
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSparseMatrix> for SparseMatrix {
    type Error = ShapeError;

    fn try_from(raw: RawSparseMatrix) -> Result<Self, ShapeError> {
        for len in [raw.cols.len(), raw.values.len()] {
            if len != raw.rows.len() {
                return Err(ShapeError::Length {
                    expected: raw.rows.len(),
                    actual: len,
                });
            }
        }
        let triplets = raw
            .rows
            .into_iter()
            .zip(raw.cols)
            .zip(raw.values)
            .map(|((row, col), value)| (row, col, value));
        Self::from_triplets(raw.nrows, raw.ncols, triplets)
    }
}

impl SparseMatrix {
    /// Creates an empty matrix with the given shape.
    #[must_use]
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates a matrix from `(row, col, value)` triplets.
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate lies outside the shape.
    pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut matrix = Self::new(nrows, ncols);
        for (row, col, value) in triplets {
            matrix.push(row, col, value)?;
        }
        Ok(matrix)
    }

    /// Creates a matrix from dense rows, keeping only the nonzero entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows have different lengths.
    pub fn from_dense(ncols: usize, dense: &[Vec<f64>]) -> Result<Self, ShapeError> {
        let mut matrix = Self::new(dense.len(), ncols);
        for (row, values) in dense.iter().enumerate() {
            if values.len() != ncols {
                return Err(ShapeError::Length {
                    expected: ncols,
                    actual: values.len(),
                });
            }
            for (col, &value) in values.iter().enumerate() {
                if value != 0.0 {
                    matrix.push(row, col, value)?;
                }
            }
        }
        Ok(matrix)
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinate lies outside the shape.
    pub fn push(&mut self, row: usize, col: usize, value: f64) -> Result<(), ShapeError> {
        if row >= self.nrows || col >= self.ncols {
            return Err(ShapeError::OutOfBounds {
                row,
                col,
                nrows: self.nrows,
                ncols: self.ncols,
            });
        }
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
        Ok(())
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the number of stored entries, counting repeats.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterates over the stored `(row, col, value)` triplets.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&row, &col), &value)| (row, col, value))
    }

    /// Returns the value at `(row, col)`, summing repeated entries.
    ///
    /// Coordinates with no stored entry read as zero.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.triplets()
            .filter(|&(r, c, _)| r == row && c == col)
            .map(|(_, _, value)| value)
            .sum()
    }

    /// Expands the matrix into dense rows.
    #[must_use]
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.ncols]; self.nrows];
        for (row, col, value) in self.triplets() {
            dense[row][col] += value;
        }
        dense
    }

    /// Writes the values into `out` in the order of `pattern`.
    ///
    /// Pattern coordinates with no stored entry are written as zero. Explicit
    /// zeros outside the pattern are tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes differ, `out` has the wrong length, or a
    /// nonzero entry lies outside the pattern.
    pub fn pack_into(&self, pattern: &SparsityPattern, out: &mut [f64]) -> Result<(), ShapeError> {
        if self.nrows != pattern.nrows() || self.ncols != pattern.ncols() {
            return Err(ShapeError::Dimensions {
                expected_rows: pattern.nrows(),
                expected_cols: pattern.ncols(),
                nrows: self.nrows,
                ncols: self.ncols,
            });
        }
        if out.len() != pattern.len() {
            return Err(ShapeError::Length {
                expected: pattern.len(),
                actual: out.len(),
            });
        }

        out.fill(0.0);
        for (row, col, value) in self.triplets() {
            match pattern.position(row, col) {
                Some(index) => out[index] += value,
                None if value == 0.0 => {}
                None => return Err(ShapeError::OutsidePattern { row, col, value }),
            }
        }
        Ok(())
    }

    /// Returns the values packed in the order of `pattern`.
    ///
    /// # Errors
    ///
    /// See [`SparseMatrix::pack_into`].
    pub fn pack(&self, pattern: &SparsityPattern) -> Result<Vec<f64>, ShapeError> {
        let mut out = vec![0.0; pattern.len()];
        self.pack_into(pattern, &mut out)?;
        Ok(out)
    }
}

/// The coordinates of a sparse matrix that may hold nonzero values.
///
/// Coordinates are unique and keep the order they were declared in; that order
/// is the layout of packed value arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsityPattern {
    nrows: usize,
    ncols: usize,
    entries: Vec<(usize, usize)>,
    index: HashMap<(usize, usize), usize>,
}

impl SparsityPattern {
    /// Creates a pattern from coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if a coordinate is out of bounds or repeated.
    pub fn new(
        nrows: usize,
        ncols: usize,
        entries: Vec<(usize, usize)>,
    ) -> Result<Self, ShapeError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, &(row, col)) in entries.iter().enumerate() {
            if row >= nrows || col >= ncols {
                return Err(ShapeError::OutOfBounds {
                    row,
                    col,
                    nrows,
                    ncols,
                });
            }
            if index.insert((row, col), position).is_some() {
                return Err(ShapeError::DuplicateEntry { row, col });
            }
        }

        Ok(Self {
            nrows,
            ncols,
            entries,
            index,
        })
    }

    /// Creates a pattern covering every coordinate, row by row.
    #[must_use]
    pub fn dense(nrows: usize, ncols: usize) -> Self {
        let entries: Vec<_> = (0..nrows)
            .flat_map(|row| (0..ncols).map(move |col| (row, col)))
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, &coord)| (coord, position))
            .collect();

        Self {
            nrows,
            ncols,
            entries,
            index,
        }
    }

    /// Creates a pattern from the coordinates stored in a matrix.
    ///
    /// Repeated coordinates collapse to their first occurrence.
    #[must_use]
    pub fn of(matrix: &SparseMatrix) -> Self {
        let mut entries = Vec::with_capacity(matrix.nnz());
        let mut index = HashMap::with_capacity(matrix.nnz());
        for (row, col, _) in matrix.triplets() {
            index.entry((row, col)).or_insert_with(|| {
                entries.push((row, col));
                entries.len() - 1
            });
        }

        Self {
            nrows: matrix.nrows(),
            ncols: matrix.ncols(),
            entries,
            index,
        }
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the number of declared coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the declared coordinates in packing order.
    #[must_use]
    pub fn entries(&self) -> &[(usize, usize)] {
        &self.entries
    }

    /// Returns the packing position of `(row, col)`, if declared.
    #[must_use]
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        self.index.get(&(row, col)).copied()
    }

    /// Rebuilds a matrix from values packed in this pattern's order.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` does not have one entry per coordinate.
    pub fn unpack(&self, values: &[f64]) -> Result<SparseMatrix, ShapeError> {
        if values.len() != self.entries.len() {
            return Err(ShapeError::Length {
                expected: self.entries.len(),
                actual: values.len(),
            });
        }
        SparseMatrix::from_triplets(
            self.nrows,
            self.ncols,
            self.entries
                .iter()
                .zip(values)
                .map(|(&(row, col), &value)| (row, col, value)),
        )
    }
}
