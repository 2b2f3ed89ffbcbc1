use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;

use ffnn::{Activation, Network};

const SIZES: [usize; 4] = [64, 128, 128, 10];
const BATCH: usize = 32;

fn batch(rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(i, j)| ((i * cols + j) as f64 * 0.37).sin())
}

fn network_forward_bench(c: &mut Criterion) {
    let net = Network::new_with_seed(&SIZES, Activation::Sigmoid, 0).unwrap();
    let x = batch(BATCH, net.input_dim());

    c.bench_function("network_forward_64_128_128_10", |b| {
        b.iter(|| {
            let out = net.forward(black_box(&x)).unwrap();
            black_box(out);
        })
    });
}

fn network_gradients_bench(c: &mut Criterion) {
    let net = Network::new_with_seed(&SIZES, Activation::Tanh, 0).unwrap();
    let x = batch(BATCH, net.input_dim());
    let y = batch(BATCH, net.output_dim()).mapv(|v| 0.5 + 0.5 * v);
    let trace = net.forward_trace(&x).unwrap();

    c.bench_function("network_gradients_64_128_128_10", |b| {
        b.iter(|| {
            let grads = net.gradients(black_box(&trace), black_box(&y)).unwrap();
            black_box(grads);
        })
    });
}

fn network_params_roundtrip_bench(c: &mut Criterion) {
    let mut net = Network::new_with_seed(&SIZES, Activation::Sigmoid, 0).unwrap();
    let params = net.params();

    c.bench_function("network_set_params_64_128_128_10", |b| {
        b.iter(|| {
            net.set_params(black_box(params.view())).unwrap();
        })
    });
}

criterion_group!(
    benches,
    network_forward_bench,
    network_gradients_bench,
    network_params_roundtrip_bench
);
criterion_main!(benches);
