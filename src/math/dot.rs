//! Thread-parallel matrix product.
//!
//! The rows of the left operand are split into `min(cap, rows)` contiguous,
//! strictly disjoint ranges. Each range is computed by one worker thread
//! running the cache-blocked kernel; remainder rows (when the row count does
//! not divide evenly) are computed by the coordinating thread while the
//! workers run. All workers are joined before the call returns, so the whole
//! operation is synchronous from the caller's point of view.

use std::thread;

use crate::math::error::MatrixError;
use crate::math::matrix::{Matrix, Scalar};

/// Upper bound on worker threads per parallel pass.
pub const DEFAULT_THREAD_CAP: usize = 8;

/// `matmul` with the default thread cap.
pub fn matmul<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>, MatrixError> {
    matmul_with_cap(a, b, DEFAULT_THREAD_CAP)
}

/// Computes `A[m×k] · B[k×n] -> M[m×n]` with at most `cap` worker threads.
///
/// Fails with `IncompatibleShape` when `A.cols != B.rows`. A worker panic is
/// rejoined on the calling thread and surfaces as a single
/// `MatrixError::WorkerPanic`.
pub fn matmul_with_cap<T: Scalar>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    cap: usize,
) -> Result<Matrix<T>, MatrixError> {
    if a.cols() != b.rows() {
        return Err(MatrixError::IncompatibleShape {
            left: a.shape(),
            right: b.shape(),
            op: "matmul",
        });
    }
    let m = a.rows();
    let k = a.cols();
    let n = b.cols();
    let mut out = Matrix::zeros(m, n)?;

    let (threads, rows_per) = partition_rows(m, cap);
    let a_data = a.as_slice();
    let b_data = b.as_slice();
    let out_data = &mut out.data[..];

    let joined: Result<(), MatrixError> = thread::scope(|s| {
        // The first `threads * rows_per` rows go to the workers in equal
        // chunks; whatever is left belongs to the coordinating thread. The
        // two ranges never overlap, so no row is computed twice.
        let (head, tail) = out_data.split_at_mut(threads * rows_per * n);
        let mut handles = Vec::with_capacity(threads);
        for (idx, chunk) in head.chunks_mut(rows_per * n).enumerate() {
            let first_row = idx * rows_per;
            handles.push(s.spawn(move || block_kernel(a_data, b_data, k, n, chunk, first_row)));
        }
        block_kernel(a_data, b_data, k, n, tail, threads * rows_per);

        // Join every worker, even after a failure, so no sibling is
        // abandoned; report the first panic as the operation's error.
        let mut first_err = None;
        for handle in handles {
            if let Err(payload) = handle.join() {
                first_err.get_or_insert(MatrixError::from_panic(payload));
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    });
    joined?;

    Ok(out)
}

/// Reference triple-loop product, single-threaded. Kept public so tests and
/// benchmarks can compare the parallel engine against it.
pub fn naive_matmul<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>, MatrixError> {
    if a.cols() != b.rows() {
        return Err(MatrixError::IncompatibleShape {
            left: a.shape(),
            right: b.shape(),
            op: "matmul",
        });
    }
    let (m, k, n) = (a.rows(), a.cols(), b.cols());
    let mut out = Matrix::zeros(m, n)?;
    for j in 0..n {
        for i in 0..m {
            let mut acc = T::zero();
            for k_idx in 0..k {
                acc = acc + a.as_slice()[i * k + k_idx] * b.as_slice()[k_idx * n + j];
            }
            out.data[i * n + j] = acc;
        }
    }
    Ok(out)
}

/// Splits `rows` across at most `cap` workers: returns `(threads, rows_per)`
/// where each worker owns `rows_per` contiguous rows and `rows % threads`
/// rows remain for the coordinator.
pub(crate) fn partition_rows(rows: usize, cap: usize) -> (usize, usize) {
    let threads = cap.max(1).min(rows);
    (threads, rows / threads)
}

/// Cache-blocked inner kernel over one contiguous row range.
///
/// `b` is stored row-major but read column-wise, which is cache-hostile;
/// each needed column is copied once into a contiguous scratch buffer and
/// reused for every row in the range. The accumulation order (column outer,
/// then rows, then the shared dimension) is fixed; changing it changes the
/// floating-point rounding of the result.
fn block_kernel<T: Scalar>(
    a: &[T],
    b: &[T],
    inner: usize,
    out_cols: usize,
    out: &mut [T],
    first_row: usize,
) {
    let rows = out.len() / out_cols;
    if rows == 0 {
        return;
    }
    let mut col_buf = vec![T::zero(); inner];
    for j in 0..out_cols {
        for k_idx in 0..inner {
            col_buf[k_idx] = b[k_idx * out_cols + j];
        }
        for i in 0..rows {
            let a_row = &a[(first_row + i) * inner..(first_row + i + 1) * inner];
            let mut acc = out[i * out_cols + j];
            for k_idx in 0..inner {
                acc = acc + a_row[k_idx] * col_buf[k_idx];
            }
            out[i * out_cols + j] = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Matrix<f64> {
        let mut m = Matrix::zeros(rows, cols).unwrap();
        m.fill(&mut StdRng::seed_from_u64(seed), -1.0, 1.0);
        m
    }

    #[test]
    fn known_two_by_two_product() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(vec![vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap();
        let c = matmul(&a, &b).unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn rejects_inner_dimension_mismatch() {
        let a: Matrix<f64> = Matrix::zeros(2, 3).unwrap();
        let b: Matrix<f64> = Matrix::zeros(2, 3).unwrap();
        assert!(matches!(
            matmul(&a, &b),
            Err(MatrixError::IncompatibleShape { op: "matmul", .. })
        ));
    }

    #[test]
    fn matches_naive_when_rows_below_thread_cap() {
        let a = random_matrix(3, 4, 1);
        let b = random_matrix(4, 5, 2);
        assert_eq!(
            matmul_with_cap(&a, &b, 8).unwrap(),
            naive_matmul(&a, &b).unwrap()
        );
    }

    #[test]
    fn matches_naive_when_rows_equal_thread_cap() {
        let a = random_matrix(8, 3, 3);
        let b = random_matrix(3, 2, 4);
        assert_eq!(
            matmul_with_cap(&a, &b, 8).unwrap(),
            naive_matmul(&a, &b).unwrap()
        );
    }

    #[test]
    fn matches_naive_with_remainder_rows() {
        // 13 rows over 4 workers leaves one remainder row for the
        // coordinator; a double-computed slice would show up as a doubled
        // accumulation here.
        let a = random_matrix(13, 7, 5);
        let b = random_matrix(7, 9, 6);
        assert_eq!(
            matmul_with_cap(&a, &b, 4).unwrap(),
            naive_matmul(&a, &b).unwrap()
        );
    }

    #[test]
    fn thread_cap_does_not_change_the_result() {
        let a = random_matrix(11, 6, 7);
        let b = random_matrix(6, 4, 8);
        let single = matmul_with_cap(&a, &b, 1).unwrap();
        let many = matmul_with_cap(&a, &b, 8).unwrap();
        assert_eq!(single, many);
    }

    #[test]
    fn row_times_column_yields_single_cell() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        let b = Matrix::from_column(&[4.0, 5.0, 6.0]).unwrap();
        let c = matmul(&a, &b).unwrap();
        assert_eq!(c.shape(), (1, 1));
        assert_eq!(c.get(0, 0).unwrap(), 32.0);
    }
}
