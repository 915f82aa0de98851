use criterion::{criterion_group, criterion_main};


use matching::register_benchmarks as register_matching_benchmarks;
use rings::register_benchmarks as register_ring_benchmarks;
use risk_gate::register_benchmarks as register_risk_benchmarks;

// Define the benchmark groups
criterion_group!(
    benches,
    register_matching_benchmarks,
    register_risk_benchmarks,
    register_ring_benchmarks,
);

criterion_main!(benches);
