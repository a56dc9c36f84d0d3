use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rug::Integer;

use qsieve::matrix::NullSpaceVectors;
use qsieve::relations::Relation;

/// Builds a synthetic relation set with a known, sparse dependency
/// structure: every factor-base prime appears in exactly a handful of
/// relations, mirroring the sparsity real sieve output has.
fn synthetic_relations(factor_base_len: usize, relation_count: usize) -> Vec<Relation> {
    (0..relation_count)
        .map(|j| {
            let mut exponents = vec![0u8; factor_base_len];
            // Touch 3 pseudo-random-but-deterministic columns per relation.
            for offset in [1usize, 7, 13] {
                exponents[(j * offset + offset) % factor_base_len] = 1;
            }
            Relation {
                x: Integer::from(j as u64 + 2),
                sign: j % 5 == 0,
                exponents,
                cofactor: 1,
                q_abs: Integer::from(j as u64 + 2),
            }
        })
        .collect()
}

fn bench_null_space_small(c: &mut Criterion) {
    let relations = synthetic_relations(64, 80);
    c.bench_function("null_space(64 primes, 80 relations)", |b| {
        b.iter(|| {
            NullSpaceVectors::compute(black_box(&relations), black_box(64), black_box(8)).count()
        });
    });
}

fn bench_null_space_medium(c: &mut Criterion) {
    let relations = synthetic_relations(300, 340);
    c.bench_function("null_space(300 primes, 340 relations)", |b| {
        b.iter(|| {
            NullSpaceVectors::compute(black_box(&relations), black_box(300), black_box(8)).count()
        });
    });
}

criterion_group!(benches, bench_null_space_small, bench_null_space_medium);
criterion_main!(benches);
