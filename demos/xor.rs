use ffnn::{Activation, Dataset, NetworkBuilder, RestartConfig, TrainConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> ffnn::Result<()> {
    // Classic XOR dataset.
    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];
    let train = Dataset::from_rows(&xs, &ys)?;

    // 2 -> 3 -> 1 network, sigmoid everywhere.
    let mut net = NetworkBuilder::from_dims(2, &[3], 1)?
        .activation(Activation::Sigmoid)
        .build_with_seed(0)?;

    let mut rng = StdRng::seed_from_u64(0);
    let report = ffnn::train_with_restarts(
        &mut net,
        &train,
        &RestartConfig {
            cycles: 10,
            train: TrainConfig { max_iter: 200 },
            ..RestartConfig::default()
        },
        &mut rng,
    )?;

    println!(
        "cycles={} improvements={} best_cost={}",
        report.cycles, report.improvements, report.best_cost
    );

    let out = net.forward(train.inputs())?;
    for (x, y) in xs.iter().zip(out.rows()) {
        println!("x={x:?} y={:.3}", y[0]);
    }

    Ok(())
}
