pub mod dot;
pub mod error;
pub mod matrix;

pub use dot::{matmul, matmul_with_cap, naive_matmul, DEFAULT_THREAD_CAP};
pub use error::MatrixError;
pub use matrix::{Matrix, Scalar};
