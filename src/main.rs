//! Command-line trainer.
//!
//! Loads whitespace-delimited training tables, trains a network with random
//! restarts, then answers `forward`, `save` and `exit` commands on stdin.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ffnn::data::{load_table, parse_table};
use ffnn::train::DEFAULT_MAX_ITER;
use ffnn::{
    default_file_name, train_with_restarts, Activation, Dataset, Network, NetworkBuilder,
    RestartConfig, StopPolicy, TrainConfig, WeightDump,
};

#[derive(Parser)]
#[command(name = "ffnn")]
#[command(about = "Train a feedforward neural network on tabular data", long_about = None)]
struct Cli {
    /// Input data points, one sample per line
    input: PathBuf,

    /// Expected outputs, one sample per line
    output: PathBuf,

    /// Training cycles; the network with the lowest cost is kept
    cycles: usize,

    /// File with pre-trained layer sizes and weights (overrides --layers)
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Width of each hidden layer
    #[arg(long, num_args = 0.., value_name = "N")]
    layers: Option<Vec<usize>>,

    /// Use the logistic sigmoid (default)
    #[arg(long, conflicts_with = "tanh")]
    sigmoid: bool,

    /// Use the hyperbolic tangent
    #[arg(long)]
    tanh: bool,

    /// Seed for weight initialization and restarts
    #[arg(long)]
    seed: Option<u64>,

    /// Optimizer iterations per training cycle
    #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// When to stop restarting: full-budget or first-finite
    #[arg(long, default_value_t = StopPolicy::FullBudget)]
    stop_policy: StopPolicy,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let x = load_table(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
    let y = load_table(&cli.output).with_context(|| format!("reading {}", cli.output.display()))?;
    let data = Dataset::new(x, y)?;
    println!("{} data points given.", data.len());
    println!(
        "This neural network will take in {} inputs and will output {} values.",
        data.input_dim(),
        data.target_dim()
    );

    let activation = if cli.tanh {
        Activation::Tanh
    } else {
        Activation::Sigmoid
    };
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut network = match &cli.params {
        Some(path) => {
            let dump = WeightDump::load(path)
                .with_context(|| format!("reading weights from {}", path.display()))?;
            dump.check_dims(data.input_dim(), data.target_dim())?;
            dump.into_network(activation)?
        }
        None => {
            let hidden = cli.layers.clone().unwrap_or_default();
            NetworkBuilder::from_dims(data.input_dim(), &hidden, data.target_dim())?
                .activation(activation)
                .build_with_rng(&mut rng)?
        }
    };
    println!("Neural network layers: {:?}", network.layer_sizes());

    println!(
        "Initial run on the {} training inputs:\n{}",
        data.len(),
        network.forward(data.inputs())?
    );
    println!("Cost function: {}", network.loss().name());
    println!("Threshold function: {}", network.activation().name());
    println!("Cost: {}", cost_of(&network, &data));

    let config = RestartConfig {
        cycles: cli.cycles,
        policy: cli.stop_policy,
        train: TrainConfig {
            max_iter: cli.max_iter,
        },
        ..RestartConfig::default()
    };
    let report = train_with_restarts(&mut network, &data, &config, &mut rng)?;
    info!(
        cycles = report.cycles,
        improvements = report.improvements,
        best_cost = report.best_cost,
        "training finished"
    );

    println!("Final results:\n{:.2}", network.forward(data.inputs())?);
    println!("Cost: {}", cost_of(&network, &data));

    let session = Session {
        network,
        input_path: cli.input,
        output_path: cli.output,
    };
    let stdin = io::stdin();
    session.run(&mut stdin.lock().lines())
}

fn cost_of(network: &Network, data: &Dataset) -> f64 {
    network
        .cost(data.inputs(), data.targets())
        .unwrap_or(f64::NAN)
}

/// The interactive command loop after training.
struct Session {
    network: Network,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl Session {
    fn run<I: Iterator<Item = io::Result<String>>>(&self, lines: &mut I) -> Result<()> {
        loop {
            let Some(line) = prompt(
                lines,
                "\nEnter one of the following commands:\n\tforward <file>\n\tsave [file]\n\texit\n\nCommand: ",
            )?
            else {
                return Ok(());
            };

            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some("forward"), Some(file)) => self.forward(Path::new(file), lines)?,
                (Some("save"), file) => self.save(file)?,
                (Some("exit"), _) => return Ok(()),
                _ => println!("Unrecognized command."),
            }
        }
    }

    fn forward<I: Iterator<Item = io::Result<String>>>(&self, file: &Path, lines: &mut I) -> Result<()> {
        let x = match load_table(file) {
            Ok(x) => x,
            Err(err) => {
                println!("ERROR: Invalid file input ({err})");
                return Ok(());
            }
        };
        let out = match self.network.forward(&x) {
            Ok(out) => out,
            Err(err) => {
                println!("ERROR: {err}");
                return Ok(());
            }
        };
        println!("{x}");
        println!("{out}");
        println!("{:.2}", out);

        let Some(answer) = prompt(lines, "Is this the expected output? (y/n): ")? else {
            return Ok(());
        };
        if answer.trim() != "n" {
            return Ok(());
        }
        let Some(correct) = prompt(lines, "What is the correct output: ")? else {
            return Ok(());
        };

        match check_answer(&correct, &x, self.network.output_dim()) {
            Ok(()) => {
                self.append_sample(file, correct.trim())?;
                println!("Added to training data. It will be used after a restart.");
            }
            Err(err) => println!("ERROR: Invalid input ({err})"),
        }
        Ok(())
    }

    /// Append the forwarded rows and the corrected outputs to the training files.
    fn append_sample(&self, file: &Path, correct: &str) -> Result<()> {
        let rows = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        append_line(&self.input_path, rows.trim_end())?;
        append_line(&self.output_path, correct)?;
        Ok(())
    }

    fn save(&self, file: Option<&str>) -> Result<()> {
        let name = file
            .map(str::to_owned)
            .unwrap_or_else(|| default_file_name(self.network.layer_sizes()));
        println!("Saving weights in {name}");
        self.network
            .save_weights(&name)
            .with_context(|| format!("writing {name}"))?;
        Ok(())
    }
}

fn prompt<I: Iterator<Item = io::Result<String>>>(lines: &mut I, text: &str) -> Result<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    Ok(lines.next().transpose()?)
}

/// The corrected output must hold one row of `output_dim` values per forwarded row.
fn check_answer(answer: &str, inputs: &Array2<f64>, output_dim: usize) -> Result<()> {
    let table = parse_table(answer)?;
    if table.nrows() != inputs.nrows() || table.ncols() != output_dim {
        bail!(
            "expected {} row(s) of {output_dim} value(s), got {}x{}",
            inputs.nrows(),
            table.nrows(),
            table.ncols()
        );
    }
    Ok(())
}

fn append_line(path: &Path, text: &str) -> Result<()> {
    let needs_newline = fs::read(path)
        .map(|bytes| bytes.last().is_some_and(|&b| b != b'\n'))
        .unwrap_or(false);

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    if needs_newline {
        writeln!(file)?;
    }
    writeln!(file, "{text}")?;
    Ok(())
}
