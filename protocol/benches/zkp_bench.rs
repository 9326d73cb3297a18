// Zero-knowledge proof benchmarks for the threshold protocol.
//
// Benchmarks relation synthesis, Groth16 setup, proof generation, and proof
// verification for the threshold relation over BN254.

use criterion::{criterion_group, criterion_main, Criterion};

use ark_std::rand::{rngs::StdRng, SeedableRng};

use zkbalance_protocol::zkp::{KeyPair, ThresholdProver, ThresholdRelation, ThresholdVerifier};

fn bench_relation_synthesis(c: &mut Criterion) {
    c.bench_function("zkp/relation_synthesis", |b| {
        b.iter(|| ThresholdRelation::new().unwrap());
    });
}

fn bench_groth16_setup(c: &mut Criterion) {
    let relation = ThresholdRelation::new().unwrap();

    c.bench_function("zkp/groth16_setup", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            KeyPair::generate(&relation, &mut rng).unwrap()
        });
    });
}

fn bench_groth16_prove(c: &mut Criterion) {
    let relation = ThresholdRelation::new().unwrap();
    let keys = KeyPair::generate(&relation, &mut StdRng::seed_from_u64(42)).unwrap();
    let prover = ThresholdProver::new(&relation, &keys);
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("zkp/groth16_prove", |b| {
        b.iter(|| prover.prove_with_rng(10_000, 500, &mut rng).unwrap());
    });
}

fn bench_groth16_verify(c: &mut Criterion) {
    let relation = ThresholdRelation::new().unwrap();
    let keys = KeyPair::generate(&relation, &mut StdRng::seed_from_u64(42)).unwrap();
    let proof = ThresholdProver::new(&relation, &keys)
        .prove(10_000, 500)
        .unwrap();
    let verifier = ThresholdVerifier::new(&keys);

    c.bench_function("zkp/groth16_verify", |b| {
        b.iter(|| verifier.verify(500, &proof).unwrap());
    });
}

criterion_group!(
    benches,
    bench_relation_synthesis,
    bench_groth16_setup,
    bench_groth16_prove,
    bench_groth16_verify,
);
criterion_main!(benches);
