pub mod network;
pub mod update;

pub use network::NeuralNetwork;
