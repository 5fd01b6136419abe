use thiserror::Error;

/// Error kinds for matrix construction, access and arithmetic.
///
/// All three shape/index kinds are detected eagerly at the boundary of the
/// operation that would violate them; no partial mutation is observable after
/// an `Err`. `WorkerPanic` is the one exception to "caller contract
/// violation": it reports a panic that happened on a spawned worker thread,
/// rejoined on the calling thread as a single error instead of being allowed
/// to kill the worker silently.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// Matrix data is empty, has an empty first row, is ragged, or is a
    /// degenerate 1×1.
    #[error("matrix of {rows}x{cols} is not well formed")]
    MalformedShape { rows: usize, cols: usize },

    /// An index-based accessor was called with `row >= rows` or `col >= cols`.
    #[error("index ({row}, {col}) out of range for {rows}x{cols} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Operand shapes do not satisfy the operation's dimension contract.
    #[error("shapes {left:?} and {right:?} are incompatible for {op}")]
    IncompatibleShape {
        left: (usize, usize),
        right: (usize, usize),
        op: &'static str,
    },

    /// A worker thread panicked during a parallel pass; the payload message
    /// is carried back to the joining caller.
    #[error("worker thread panicked: {0}")]
    WorkerPanic(String),
}

impl MatrixError {
    /// Converts a `JoinHandle` panic payload into a `WorkerPanic`.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> MatrixError {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        MatrixError::WorkerPanic(msg)
    }
}
