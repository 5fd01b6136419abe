//! MNIST-style CSV train/test harness.
//!
//! Each record is `label,p0,p1,...` with pixel values in 0–255. Pixels are
//! normalized into `[0.01, 1.0)` to keep them inside the sigmoid's effective
//! input range, and labels are one-hot encoded as 0.01/0.99 so the targets
//! stay reachable by a sigmoid output.
//!
//! Run with:
//!   cargo run --release -- mnist_train.csv mnist_test.csv [epochs]

use std::env;
use std::error::Error;
use std::fs;
use std::process;
use std::time::Instant;

use magnetite_nn::{evaluate, train_loop, NeuralNetwork, TrainConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

const INPUT_NODES: usize = 784;
const HIDDEN_NODES: usize = 100;
const OUTPUT_NODES: usize = 10;
const LEARNING_RATE: f64 = 0.3;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <train.csv> <test.csv> [epochs]", args[0]);
        process::exit(2);
    }
    let epochs = match args.get(3) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                eprintln!("epochs must be a positive integer, got '{}'", raw);
                process::exit(2);
            }
        },
        None => 1,
    };

    if let Err(e) = run(&args[1], &args[2], epochs) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(train_path: &str, test_path: &str, epochs: usize) -> Result<(), Box<dyn Error>> {
    let (train_inputs, train_targets) = load_csv(train_path)?;
    let (test_inputs, test_targets) = load_csv(test_path)?;
    println!(
        "Loaded {} training and {} test records.",
        train_inputs.len(),
        test_inputs.len()
    );

    let mut network = NeuralNetwork::new(INPUT_NODES, HIDDEN_NODES, OUTPUT_NODES, LEARNING_RATE)?;
    let mut rng = StdRng::from_entropy();
    network.initialize(&mut rng);

    println!("Training...");
    let train_start = Instant::now();
    let mut config = TrainConfig::new(1);
    config.shuffle = true;
    for epoch in 1..=epochs {
        let loss = train_loop(&mut network, &train_inputs, &train_targets, &config, &mut rng)?;
        println!("Epoch {}/{}: loss = {:.6}", epoch, epochs, loss);
    }
    let train_elapsed = train_start.elapsed();

    println!("Testing...");
    let test_start = Instant::now();
    let (passes, total) = evaluate(&mut network, &test_inputs, &test_targets)?;
    let test_elapsed = test_start.elapsed();

    println!();
    println!("Total training time:\t{:.2?}", train_elapsed);
    println!("Total testing time:\t{:.2?}", test_elapsed);
    println!("Number of tests:\t{}", total);
    println!("Number of passes:\t{}", passes);
    println!("Accuracy:\t\t{:.2}%", passes as f64 / total as f64 * 100.0);
    Ok(())
}

/// Parses a `label,p0,...,p783` CSV into normalized inputs and one-hot targets.
fn load_csv(path: &str) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let mut inputs = Vec::new();
    let mut targets = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let label: usize = fields
            .next()
            .ok_or_else(|| format!("{}:{}: missing label", path, line_no + 1))?
            .trim()
            .parse()
            .map_err(|e| format!("{}:{}: bad label: {}", path, line_no + 1, e))?;
        if label >= OUTPUT_NODES {
            return Err(format!("{}:{}: label {} out of range", path, line_no + 1, label).into());
        }

        let mut record = Vec::with_capacity(INPUT_NODES);
        for field in fields {
            let raw: f64 = field
                .trim()
                .parse()
                .map_err(|e| format!("{}:{}: bad pixel value: {}", path, line_no + 1, e))?;
            record.push(raw / 255.0 * 0.99 + 0.01);
        }
        if record.len() != INPUT_NODES {
            return Err(format!(
                "{}:{}: expected {} pixels, found {}",
                path,
                line_no + 1,
                INPUT_NODES,
                record.len()
            )
            .into());
        }

        let mut target = vec![0.01; OUTPUT_NODES];
        target[label] = 0.99;
        inputs.push(record);
        targets.push(target);
    }

    if inputs.is_empty() {
        return Err(format!("{}: no records found", path).into());
    }
    Ok((inputs, targets))
}
