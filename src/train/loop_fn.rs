use std::sync::atomic::Ordering;
use std::time::Instant;

use num_traits::ToPrimitive;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::math::error::MatrixError;
use crate::math::matrix::{Matrix, Scalar};
use crate::network::network::NeuralNetwork;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

/// Trains `network` for `config.epochs` epochs and returns the mean training
/// loss of the last completed epoch.
///
/// Each epoch runs every `(input, target)` pair through one `train` step;
/// loss and accuracy are measured from a `query` on the pre-update weights.
///
/// # Early termination
/// The loop breaks early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
///
/// # Panics
/// Panics if `inputs` is empty or the lengths of `inputs` and `targets`
/// differ; these are harness bugs, not runtime conditions.
pub fn train_loop<T: Scalar, R: Rng>(
    network: &mut NeuralNetwork<T>,
    inputs: &[Vec<T>],
    targets: &[Vec<T>],
    config: &TrainConfig,
    rng: &mut R,
) -> Result<f64, MatrixError> {
    assert!(!inputs.is_empty(), "inputs must not be empty");
    assert_eq!(
        inputs.len(),
        targets.len(),
        "inputs and targets must have equal length"
    );

    let mut order: Vec<usize> = (0..inputs.len()).collect();
    let mut last_train_loss = 0.0;

    for epoch in 1..=config.epochs {
        if let Some(ref flag) = config.stop_flag {
            if flag.load(Ordering::Relaxed) {
                break;
            }
        }

        let t_start = Instant::now();
        if config.shuffle {
            order.shuffle(rng);
        }

        let mut loss_sum = 0.0;
        let mut correct = 0usize;
        for &idx in &order {
            let input = &inputs[idx];
            let target = &targets[idx];
            let output = network.query(input)?;
            loss_sum += mean_squared_error(&output, target);
            if argmax(&output) == argmax_slice(target) {
                correct += 1;
            }
            network.train(input, target)?;
        }
        last_train_loss = loss_sum / inputs.len() as f64;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss: last_train_loss,
            accuracy: correct as f64 / inputs.len() as f64,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        if let Some(ref tx) = config.progress_tx {
            if tx.send(stats).is_err() {
                // Receiver gone; treat as a stop request.
                break;
            }
        }
    }

    Ok(last_train_loss)
}

/// Runs `query` over a test set and counts arg-max matches against the
/// one-hot targets. Returns `(correct, total)`.
pub fn evaluate<T: Scalar>(
    network: &mut NeuralNetwork<T>,
    inputs: &[Vec<T>],
    targets: &[Vec<T>],
) -> Result<(usize, usize), MatrixError> {
    assert_eq!(
        inputs.len(),
        targets.len(),
        "inputs and targets must have equal length"
    );
    let mut correct = 0usize;
    for (input, target) in inputs.iter().zip(targets) {
        let output = network.query(input)?;
        if argmax(&output) == argmax_slice(target) {
            correct += 1;
        }
    }
    Ok((correct, inputs.len()))
}

/// Index of the greatest value in the first column of `m` — the predicted
/// class of a network output buffer.
pub fn argmax<T: Scalar>(m: &Matrix<T>) -> usize {
    let cols = m.cols();
    let mut best = 0;
    let mut greatest = m.as_slice()[0];
    for i in 1..m.rows() {
        let value = m.as_slice()[i * cols];
        if value > greatest {
            greatest = value;
            best = i;
        }
    }
    best
}

fn argmax_slice<T: Scalar>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn mean_squared_error<T: Scalar>(output: &Matrix<T>, target: &[T]) -> f64 {
    let sum: f64 = output
        .as_slice()
        .iter()
        .zip(target)
        .map(|(&o, &t)| {
            let d = (t - o).to_f64().unwrap_or(f64::NAN);
            d * d
        })
        .sum();
    sum / target.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Arc};

    fn two_class_set() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        (
            vec![vec![0.9, 0.1], vec![0.1, 0.9], vec![0.8, 0.2], vec![0.2, 0.8]],
            vec![
                vec![0.99, 0.01],
                vec![0.01, 0.99],
                vec![0.99, 0.01],
                vec![0.01, 0.99],
            ],
        )
    }

    #[test]
    fn loss_falls_and_the_classes_separate() {
        let (inputs, targets) = two_class_set();
        let mut net = NeuralNetwork::new(2, 4, 2, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        net.initialize(&mut rng);

        let config = TrainConfig::new(100);
        let first = train_loop(&mut net, &inputs, &targets, &config, &mut rng).unwrap();
        let second = train_loop(&mut net, &inputs, &targets, &config, &mut rng).unwrap();
        assert!(second < first);

        let (correct, total) = evaluate(&mut net, &inputs, &targets).unwrap();
        assert_eq!((correct, total), (4, 4));
    }

    #[test]
    fn progress_channel_gets_one_stats_per_epoch() {
        let (inputs, targets) = two_class_set();
        let mut net = NeuralNetwork::new(2, 4, 2, 0.3).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        net.initialize(&mut rng);

        let (tx, rx) = mpsc::channel();
        let mut config = TrainConfig::new(5);
        config.progress_tx = Some(tx);
        train_loop(&mut net, &inputs, &targets, &config, &mut rng).unwrap();
        drop(config);

        let stats: Vec<EpochStats> = rx.iter().collect();
        assert_eq!(stats.len(), 5);
        assert_eq!(stats[0].epoch, 1);
        assert_eq!(stats[4].epoch, 5);
        assert!(stats.iter().all(|s| s.total_epochs == 5));
    }

    #[test]
    fn preset_stop_flag_prevents_any_epoch() {
        let (inputs, targets) = two_class_set();
        let mut net = NeuralNetwork::new(2, 4, 2, 0.3).unwrap();
        let mut rng = StdRng::seed_from_u64(13);
        net.initialize(&mut rng);
        let before = net.input_hidden().clone();

        let mut config = TrainConfig::new(50);
        config.stop_flag = Some(Arc::new(AtomicBool::new(true)));
        let loss = train_loop(&mut net, &inputs, &targets, &config, &mut rng).unwrap();
        assert_eq!(loss, 0.0);
        assert_eq!(net.input_hidden(), &before);
    }

    #[test]
    fn shuffled_training_still_converges() {
        let (inputs, targets) = two_class_set();
        let mut net = NeuralNetwork::new(2, 4, 2, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(14);
        net.initialize(&mut rng);

        let mut config = TrainConfig::new(200);
        config.shuffle = true;
        train_loop(&mut net, &inputs, &targets, &config, &mut rng).unwrap();
        let (correct, total) = evaluate(&mut net, &inputs, &targets).unwrap();
        assert_eq!((correct, total), (4, 4));
    }

    #[test]
    fn argmax_picks_the_greatest_row() {
        let m = Matrix::from_column(&[0.1, 0.7, 0.3]).unwrap();
        assert_eq!(argmax(&m), 1);
    }
}
