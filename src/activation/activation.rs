use crate::math::matrix::{Matrix, Scalar};

/// Logistic sigmoid, `1 / (1 + e^(-x))`.
///
/// Pure and total: extreme inputs saturate to 0 or 1 through ordinary
/// floating-point overflow of `exp`, they never fail.
pub fn sigmoid<T: Scalar>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

/// Sigmoid derivative expressed in terms of the *activation* `a = sigmoid(x)`:
/// `a * (1 - a)`. This is the form the delta rule consumes, since only the
/// activations are kept after a forward pass.
pub fn sigmoid_derivative_from_output<T: Scalar>(a: T) -> T {
    a * (T::one() - a)
}

/// Applies the sigmoid in place to the first column of `m`.
///
/// Activation buffers are N×1 column vectors, so this covers the whole
/// buffer; for a wider matrix only column 0 is touched.
pub fn activate_column<T: Scalar>(m: &mut Matrix<T>) {
    let cols = m.cols();
    for i in 0..m.rows() {
        m.data[i * cols] = sigmoid(m.data[i * cols]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_of_zero_is_half() {
        assert_eq!(sigmoid(0.0f64), 0.5);
    }

    #[test]
    fn sigmoid_saturates_instead_of_failing() {
        assert_eq!(sigmoid(1000.0f64), 1.0);
        assert_eq!(sigmoid(-1000.0f64), 0.0);
    }

    #[test]
    fn sigmoid_is_symmetric_around_half() {
        let x = 0.73f64;
        assert!((sigmoid(x) + sigmoid(-x) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn derivative_from_output_peaks_at_half() {
        assert_eq!(sigmoid_derivative_from_output(0.5f64), 0.25);
        assert!(sigmoid_derivative_from_output(0.99f64) < 0.25);
    }

    #[test]
    fn activate_column_runs_over_every_row() {
        let mut m = Matrix::from_column(&[0.0, 0.0, 0.0]).unwrap();
        activate_column(&mut m);
        assert_eq!(m.as_slice(), &[0.5, 0.5, 0.5]);
    }
}
