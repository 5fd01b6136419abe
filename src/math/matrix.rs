use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::fmt;

use crate::math::error::MatrixError;

/// Scalar bound for every matrix element type: floating-point arithmetic,
/// uniform sampling for `fill`, and `Send + Sync` so read-only views can be
/// shared with worker threads.
pub trait Scalar: num_traits::Float + SampleUniform + Send + Sync + fmt::Debug + 'static {}

impl<T> Scalar for T where T: num_traits::Float + SampleUniform + Send + Sync + fmt::Debug + 'static {}

/// Dense rectangular matrix with a flat, row-major backing buffer.
///
/// Element `(i, j)` lives at `data[i * cols + j]`. The flat layout is what
/// lets the parallel engines hand each worker a disjoint `&mut` range of
/// whole rows from the same buffer, with no locks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    pub(crate) data: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    /// Allocates a zero-filled `rows`×`cols` matrix.
    ///
    /// Internal allocation only rejects empty dimensions; the stricter
    /// degenerate-shape rule applies to `from_rows`, so an operation may
    /// still produce a 1×1 result (e.g. the output buffer of a
    /// single-output network).
    pub fn zeros(rows: usize, cols: usize) -> Result<Matrix<T>, MatrixError> {
        if rows == 0 || cols == 0 {
            return Err(MatrixError::MalformedShape { rows, cols });
        }
        Ok(Matrix {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        })
    }

    /// Wraps caller-provided row data, validating the shape invariant:
    /// non-empty, non-empty first row, uniform row lengths, and not a
    /// degenerate single-element matrix.
    ///
    /// The degenerate rule is asymmetric on purpose: 1×N and N×1 matrices
    /// pass, only 1×1 is rejected.
    pub fn from_rows(rows_data: Vec<Vec<T>>) -> Result<Matrix<T>, MatrixError> {
        let rows = rows_data.len();
        let cols = rows_data.first().map_or(0, |r| r.len());
        if rows == 0 || cols == 0 || (rows < 2 && cols < 2) {
            return Err(MatrixError::MalformedShape { rows, cols });
        }
        let mut data = Vec::with_capacity(rows * cols);
        for row in rows_data {
            if row.len() != cols {
                return Err(MatrixError::MalformedShape {
                    rows,
                    cols: row.len(),
                });
            }
            data.extend_from_slice(&row);
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Wraps a slice as an N×1 column vector.
    pub fn from_column(values: &[T]) -> Result<Matrix<T>, MatrixError> {
        if values.is_empty() {
            return Err(MatrixError::MalformedShape { rows: 0, cols: 1 });
        }
        Ok(Matrix {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T, MatrixError> {
        if row >= self.rows || col >= self.cols {
            return Err(self.out_of_range(row, col));
        }
        Ok(self.data[row * self.cols + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<(), MatrixError> {
        if row >= self.rows || col >= self.cols {
            return Err(self.out_of_range(row, col));
        }
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    /// Fills every cell with an independent draw from `Uniform[low, high)`.
    ///
    /// The random source is owned by the caller, so a test can pass
    /// `StdRng::seed_from_u64(..)` and get a reproducible matrix; the
    /// library never seeds or reseeds on its own.
    pub fn fill<R: Rng + ?Sized>(&mut self, rng: &mut R, low: T, high: T) {
        let dist = Uniform::new(low, high);
        for cell in &mut self.data {
            *cell = dist.sample(rng);
        }
    }

    /// Returns a new `cols`×`rows` matrix with `result[i][j] = self[j][i]`.
    pub fn transpose(&self) -> Matrix<T> {
        let mut data = vec![T::zero(); self.rows * self.cols];
        for i in 0..self.cols {
            for j in 0..self.rows {
                data[i * self.rows + j] = self.data[j * self.cols + i];
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Elementwise subtraction; both operands must have the same shape.
    pub fn sub(&self, rhs: &Matrix<T>) -> Result<Matrix<T>, MatrixError> {
        if self.shape() != rhs.shape() {
            return Err(MatrixError::IncompatibleShape {
                left: self.shape(),
                right: rhs.shape(),
                op: "sub",
            });
        }
        let data = self
            .data
            .iter()
            .zip(&rhs.data)
            .map(|(&a, &b)| a - b)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Matrix product via the parallel dot engine with the default thread
    /// cap.
    pub fn matmul(&self, rhs: &Matrix<T>) -> Result<Matrix<T>, MatrixError> {
        crate::math::dot::matmul(self, rhs)
    }

    fn out_of_range(&self, row: usize, col: usize) -> MatrixError {
        MatrixError::OutOfRange {
            row,
            col,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl<T: Scalar + fmt::Display> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{}", self.data[i * self.cols + j])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
