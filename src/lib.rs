pub mod math;
pub mod activation;
pub mod network;
pub mod train;

// Convenience re-exports
pub use math::error::MatrixError;
pub use math::matrix::{Matrix, Scalar};
pub use math::dot::{matmul, matmul_with_cap, DEFAULT_THREAD_CAP};
pub use activation::activation::sigmoid;
pub use network::network::NeuralNetwork;
pub use train::epoch_stats::EpochStats;
pub use train::train_config::TrainConfig;
pub use train::loop_fn::{evaluate, train_loop};
