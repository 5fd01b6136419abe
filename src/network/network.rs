use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Serialize, Deserialize};

use crate::activation::activation::activate_column;
use crate::math::dot::{matmul_with_cap, DEFAULT_THREAD_CAP};
use crate::math::error::MatrixError;
use crate::math::matrix::{Matrix, Scalar};
use crate::network::update::delta_update;

/// Three-layer feed-forward network (input, hidden, output) trained with a
/// per-node delta rule.
///
/// Two weight matrices carry all learned state: `input_hidden`
/// (hidden×input) and `hidden_output` (output×hidden). The two activation
/// buffers are N×1 columns, overwritten on every forward pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralNetwork<T> {
    input_nodes: usize,
    hidden_nodes: usize,
    output_nodes: usize,
    learning_rate: T,
    thread_cap: usize,
    input_hidden: Matrix<T>,
    hidden_output: Matrix<T>,
    out_hidden: Matrix<T>,
    out_output: Matrix<T>,
}

impl<T: Scalar> NeuralNetwork<T> {
    /// Builds a network with the given fixed topology and learning rate.
    /// Weights start zeroed; call [`initialize`](Self::initialize) once
    /// before training or querying.
    pub fn new(
        input_nodes: usize,
        hidden_nodes: usize,
        output_nodes: usize,
        learning_rate: T,
    ) -> Result<NeuralNetwork<T>, MatrixError> {
        Ok(NeuralNetwork {
            input_nodes,
            hidden_nodes,
            output_nodes,
            learning_rate,
            thread_cap: DEFAULT_THREAD_CAP,
            input_hidden: Matrix::zeros(hidden_nodes, input_nodes)?,
            hidden_output: Matrix::zeros(output_nodes, hidden_nodes)?,
            out_hidden: Matrix::zeros(hidden_nodes, 1)?,
            out_output: Matrix::zeros(output_nodes, 1)?,
        })
    }

    /// Overrides the worker-thread cap used by both the dot engine and the
    /// weight-update passes.
    pub fn with_thread_cap(mut self, cap: usize) -> NeuralNetwork<T> {
        self.thread_cap = cap.max(1);
        self
    }

    /// Randomizes both weight matrices, drawing each layer's weights
    /// uniformly from `[-1/sqrt(fan_in), 1/sqrt(fan_in))` where fan_in is
    /// that layer's inbound-connection count (its column count).
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let hidden_bound = fan_in_bound(&self.input_hidden);
        self.input_hidden.fill(rng, -hidden_bound, hidden_bound);
        let output_bound = fan_in_bound(&self.hidden_output);
        self.hidden_output.fill(rng, -output_bound, output_bound);
    }

    /// Replaces both weight matrices, e.g. with weights restored from disk
    /// or fixed values in a test. Shapes must match the topology.
    pub fn set_weights(
        &mut self,
        input_hidden: Matrix<T>,
        hidden_output: Matrix<T>,
    ) -> Result<(), MatrixError> {
        if input_hidden.shape() != (self.hidden_nodes, self.input_nodes) {
            return Err(MatrixError::IncompatibleShape {
                left: input_hidden.shape(),
                right: (self.hidden_nodes, self.input_nodes),
                op: "set_weights",
            });
        }
        if hidden_output.shape() != (self.output_nodes, self.hidden_nodes) {
            return Err(MatrixError::IncompatibleShape {
                left: hidden_output.shape(),
                right: (self.output_nodes, self.hidden_nodes),
                op: "set_weights",
            });
        }
        self.input_hidden = input_hidden;
        self.hidden_output = hidden_output;
        Ok(())
    }

    /// Forward pass: two sequential matmul + sigmoid layers. Returns the
    /// output activations as an `output_nodes`×1 column. Weights are not
    /// modified; only the activation buffers are overwritten.
    pub fn query(&mut self, input: &[T]) -> Result<Matrix<T>, MatrixError> {
        if input.len() != self.input_nodes {
            return Err(MatrixError::IncompatibleShape {
                left: (input.len(), 1),
                right: (self.input_nodes, 1),
                op: "query",
            });
        }
        let input_col = Matrix::from_column(input)?;
        self.out_hidden = matmul_with_cap(&self.input_hidden, &input_col, self.thread_cap)?;
        activate_column(&mut self.out_hidden);
        self.out_output = matmul_with_cap(&self.hidden_output, &self.out_hidden, self.thread_cap)?;
        activate_column(&mut self.out_output);
        Ok(self.out_output.clone())
    }

    /// One training step on a single example.
    ///
    /// Runs the forward pass, then updates `hidden_output` from the output
    /// error and `input_hidden` from the back-propagated hidden error. The
    /// hidden error is deliberately the simplified rule
    /// `transpose(hidden_output) · output_error`, computed from the weights
    /// *after* their update and without the hidden layer's own sigmoid
    /// derivative; the derivative only enters at each per-row update. This
    /// is not full chain-rule backpropagation and must not be "corrected" —
    /// trained models depend on this exact rule.
    pub fn train(&mut self, input: &[T], target: &[T]) -> Result<(), MatrixError> {
        // Both contracts are checked before anything is mutated.
        if target.len() != self.output_nodes {
            return Err(MatrixError::IncompatibleShape {
                left: (target.len(), 1),
                right: (self.output_nodes, 1),
                op: "train",
            });
        }
        if input.len() != self.input_nodes {
            return Err(MatrixError::IncompatibleShape {
                left: (input.len(), 1),
                right: (self.input_nodes, 1),
                op: "train",
            });
        }

        self.query(input)?;

        let target_col = Matrix::from_column(target)?;
        let output_error = target_col.sub(&self.out_output)?;
        let hidden_out_t = self.out_hidden.transpose();
        delta_update(
            &mut self.hidden_output,
            &output_error,
            &hidden_out_t,
            &self.out_output,
            self.learning_rate,
            self.thread_cap,
        )?;

        let hidden_error =
            matmul_with_cap(&self.hidden_output.transpose(), &output_error, self.thread_cap)?;
        let input_row = Matrix::from_rows(vec![input.to_vec()])?;
        delta_update(
            &mut self.input_hidden,
            &hidden_error,
            &input_row,
            &self.out_hidden,
            self.learning_rate,
            self.thread_cap,
        )?;
        Ok(())
    }

    pub fn input_nodes(&self) -> usize {
        self.input_nodes
    }

    pub fn hidden_nodes(&self) -> usize {
        self.hidden_nodes
    }

    pub fn output_nodes(&self) -> usize {
        self.output_nodes
    }

    pub fn learning_rate(&self) -> T {
        self.learning_rate
    }

    pub fn input_hidden(&self) -> &Matrix<T> {
        &self.input_hidden
    }

    pub fn hidden_output(&self) -> &Matrix<T> {
        &self.hidden_output
    }
}

impl<T: Scalar + Serialize> NeuralNetwork<T> {
    /// Serializes the network (topology plus weights) to pretty-printed JSON.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

impl<T: Scalar + DeserializeOwned> NeuralNetwork<T> {
    /// Deserializes a network previously written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<NeuralNetwork<T>> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

/// Initialization bound from a layer's inbound-connection count: the
/// fan-in is the weight matrix's column count.
fn fan_in_bound<T: Scalar>(weights: &Matrix<T>) -> T {
    let fan_in = T::from(weights.cols()).expect("node count must be representable as the scalar");
    T::one() / fan_in.sqrt()
}
