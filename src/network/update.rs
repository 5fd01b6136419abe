//! Row-parallel delta-rule weight update.
//!
//! For a weight matrix with R rows, each worker owns a contiguous, strictly
//! disjoint band of rows and rewrites them in place; rows never overlap, so
//! the pass needs no locks. Parallelism is bounded by the same thread cap as
//! the dot engine, never one thread per row.
//! Because every row's update depends only on that row's error and
//! activation, the result is bit-identical no matter how many workers run.

use std::thread;

use crate::math::dot::partition_rows;
use crate::math::error::MatrixError;
use crate::math::matrix::{Matrix, Scalar};

/// Applies the per-node delta rule to every row of `weights`:
///
/// ```text
/// dw = -error[i] * activation[i] * (1 - activation[i]) * layer_input[j]
/// weight[i][j] = weight[i][j] - learning_rate * dw
/// ```
///
/// Shape contract for a R×C weight matrix: `error` and `activations` are
/// R×1 columns, `layer_input` is a 1×C row. Violations fail with
/// `IncompatibleShape` before any weight is touched.
pub(crate) fn delta_update<T: Scalar>(
    weights: &mut Matrix<T>,
    error: &Matrix<T>,
    layer_input: &Matrix<T>,
    activations: &Matrix<T>,
    learning_rate: T,
    cap: usize,
) -> Result<(), MatrixError> {
    let (r, c) = weights.shape();
    let expect = |m: &Matrix<T>, shape: (usize, usize)| -> Result<(), MatrixError> {
        if m.shape() != shape {
            return Err(MatrixError::IncompatibleShape {
                left: m.shape(),
                right: shape,
                op: "delta_update",
            });
        }
        Ok(())
    };
    expect(error, (r, 1))?;
    expect(activations, (r, 1))?;
    expect(layer_input, (1, c))?;

    let (threads, rows_per) = partition_rows(r, cap);
    let err = error.as_slice();
    let act = activations.as_slice();
    let input = layer_input.as_slice();
    let weight_data = &mut weights.data[..];

    let joined: Result<(), MatrixError> = thread::scope(|s| {
        let (head, tail) = weight_data.split_at_mut(threads * rows_per * c);
        let mut handles = Vec::with_capacity(threads);
        for (idx, band) in head.chunks_mut(rows_per * c).enumerate() {
            let first_row = idx * rows_per;
            handles.push(s.spawn(move || {
                update_rows(band, first_row, c, err, act, input, learning_rate)
            }));
        }
        // Remainder rows, on the coordinating thread; disjoint from every band.
        update_rows(tail, threads * rows_per, c, err, act, input, learning_rate);

        let mut first_err = None;
        for handle in handles {
            if let Err(payload) = handle.join() {
                first_err.get_or_insert(MatrixError::from_panic(payload));
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });
    joined
}

fn update_rows<T: Scalar>(
    band: &mut [T],
    first_row: usize,
    cols: usize,
    error: &[T],
    activations: &[T],
    layer_input: &[T],
    learning_rate: T,
) {
    let rows = band.len() / cols;
    for i in 0..rows {
        let e = error[first_row + i];
        let a = activations[first_row + i];
        for j in 0..cols {
            let dw = -e * a * (T::one() - a) * layer_input[j];
            band[i * cols + j] = band[i * cols + j] - learning_rate * dw;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn applies_the_delta_rule_per_row() {
        let mut w = Matrix::from_rows(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let error = Matrix::from_column(&[1.0, 2.0]).unwrap();
        let input = Matrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let act = Matrix::from_column(&[0.5, 0.5]).unwrap();

        delta_update(&mut w, &error, &input, &act, 0.1, 8).unwrap();

        // dw = -e * 0.25 * in_j, so w grows by 0.1 * e * 0.25 * in_j.
        assert_eq!(w.as_slice(), &[1.025, 1.05, 1.05, 1.1]);
    }

    #[test]
    fn thread_count_does_not_change_the_weights() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut base = Matrix::zeros(23, 11).unwrap();
        base.fill(&mut rng, -1.0, 1.0);
        let mut error = Matrix::zeros(23, 1).unwrap();
        error.fill(&mut rng, -0.5, 0.5);
        let mut input = Matrix::zeros(1, 11).unwrap();
        input.fill(&mut rng, 0.0, 1.0);
        let mut act = Matrix::zeros(23, 1).unwrap();
        act.fill(&mut rng, 0.01, 0.99);

        let mut single = base.clone();
        let mut many = base.clone();
        delta_update(&mut single, &error, &input, &act, 0.3, 1).unwrap();
        delta_update(&mut many, &error, &input, &act, 0.3, 8).unwrap();
        assert_eq!(single, many);
        assert_ne!(single, base);
    }

    #[test]
    fn rejects_mismatched_operand_shapes() {
        let mut w = Matrix::zeros(3, 2).unwrap();
        let error = Matrix::from_column(&[1.0, 2.0]).unwrap(); // 2×1, needs 3×1
        let input = Matrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let act = Matrix::from_column(&[0.5, 0.5, 0.5]).unwrap();
        let before = w.clone();

        assert!(matches!(
            delta_update(&mut w, &error, &input, &act, 0.1, 8),
            Err(MatrixError::IncompatibleShape { op: "delta_update", .. })
        ));
        assert_eq!(w, before);
    }
}
