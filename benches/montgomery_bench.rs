use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qsieve::montgomery::{AnyReducer64, MontgomeryU64, Reducer};
use qsieve::uint128::U128;

fn bench_montgomery_multiply(c: &mut Criterion) {
    let m = MontgomeryU64::new(1_000_000_007);
    let a = m.to_residue(123_456_789);
    let b = m.to_residue(987_654_321);
    c.bench_function("montgomery_multiply(large)", |bch| {
        bch.iter(|| m.multiply(black_box(a), black_box(b)));
    });
}

fn bench_montgomery_pow(c: &mut Criterion) {
    let m = MontgomeryU64::new(1_000_000_007);
    let base = m.to_residue(123_456_789);
    c.bench_function("montgomery_pow(large exponent)", |bch| {
        bch.iter(|| m.pow(black_box(base), black_box(987_654_321)));
    });
}

fn bench_any_reducer_dispatch(c: &mut Criterion) {
    let odd = AnyReducer64::for_modulus(1_000_000_007);
    let even = AnyReducer64::for_modulus(1_000_000_008);
    c.bench_function("any_reducer_pow(odd modulus)", |bch| {
        let r = odd.to_residue(123_456_789);
        bch.iter(|| odd.pow(black_box(r), black_box(987_654_321)));
    });
    c.bench_function("any_reducer_pow(even modulus)", |bch| {
        let r = even.to_residue(123_456_789);
        bch.iter(|| even.pow(black_box(r), black_box(987_654_321)));
    });
}

fn bench_u128_mulmod(c: &mut Criterion) {
    let n = 0xFFFF_FFFF_FFFF_FFC5u64; // large prime near u64::MAX
    c.bench_function("u128_mulmod(near u64::MAX modulus)", |bch| {
        bch.iter(|| U128::mulmod(black_box(n - 12345), black_box(n - 98765), black_box(n)));
    });
}

criterion_group!(
    benches,
    bench_montgomery_multiply,
    bench_montgomery_pow,
    bench_any_reducer_dispatch,
    bench_u128_mulmod,
);
criterion_main!(benches);
