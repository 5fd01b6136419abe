pub mod activation;

pub use activation::{activate_column, sigmoid, sigmoid_derivative_from_output};
