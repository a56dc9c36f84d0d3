//! Primality testing (spec §4.D).
//!
//! The `u64` path is a fixed deterministic Miller-Rabin witness set,
//! generalizing the teacher's `mr_screened_test`/`lib.rs` two-tier screening
//! idea (cheap pre-screen, then a stronger test only when the pre-screen
//! passes) down to the 64-bit domain the sieve's factor-base and smoothness
//! checks live in. The big-integer path defers to `rug`'s own
//! Baillie-PSW-backed `is_probably_prime`, exactly as the teacher does in
//! `lib.rs::mr_screened_test` and `verify.rs`.

use crate::montgomery::{AnyReducer64, MontgomeryU64, Reducer};
use rug::integer::IsPrime;
use rug::Integer;

/// Deterministic witness set for 64-bit Miller-Rabin (spec §4.D): correct
/// for every `u64` input, per Pomerance/Selfridge/Wagstaff and its later
/// extensions.
const WITNESSES_U64: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// `a^e mod m` (spec §4.B), dispatching through a Montgomery reducer for
/// odd `m` rather than the schoolbook `U128::powmod`; falls back to the
/// native reducer for even `m`.
pub fn pow_mod_u64(a: u64, e: u64, m: u64) -> u64 {
    let reducer = AnyReducer64::for_modulus(m);
    let base = reducer.to_residue(a % m);
    reducer.from_residue(reducer.pow(base, e))
}

/// Deterministic primality test for `n < 2^64` (spec §4.D). Uses a
/// Montgomery reducer for the modular exponentiation (spec §4.D: "Uses
/// Montgomery `pow_mod_u64`") — by the time the witness loop runs, the
/// small-prime screen above has already established `n` is odd.
pub fn is_prime_u64(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &WITNESSES_U64 {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }

    let mut d = n - 1;
    let mut r = 0u32;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    let reducer = MontgomeryU64::new(n);
    let one_res = reducer.one();
    let neg_one_res = reducer.to_residue(n - 1);

    'witness: for &a in &WITNESSES_U64 {
        let base = reducer.to_residue(a % n);
        let mut x = reducer.pow(base, d);
        if reducer.equals(x, one_res) || reducer.equals(x, neg_one_res) {
            continue;
        }
        for _ in 1..r {
            x = reducer.square(x);
            if reducer.equals(x, neg_one_res) {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Probable-primality test for arbitrary-precision `n` (spec §4.D), used to
/// confirm a sieve survivor's large cofactor is genuinely prime before it is
/// accepted into the factor base of a relation. `reps` controls the number
/// of additional Miller-Rabin rounds beyond `rug`'s built-in Baillie-PSW
/// check (25 matches the teacher's default in `verify.rs`'s PRP tier).
pub fn is_probably_prime(n: &Integer, reps: u32) -> bool {
    !matches!(n.is_probably_prime(reps), IsPrime::No)
}

/// Trial-divides `n` by the fixed small-prime table before falling back to
/// [`is_probably_prime`], mirroring the teacher's `has_small_factor`
/// fast-reject used ahead of any expensive primality call.
pub fn has_small_factor(n: &Integer, small_primes: &[u32]) -> bool {
    for &p in small_primes {
        if *n == p {
            return false;
        }
        if n.mod_u(p) == 0 {
            return true;
        }
    }
    false
}

/// Splits a sieve-survivor cofactor into two primes each `<= bound`, for the
/// optional two-large-prime extension (spec.md §9 Open Question, resolved
/// in SPEC_FULL.md as opt-in via `Config::process_double_partial_relations`).
/// Uses Pollard's rho with Montgomery-backed `mulmod` — the exact use spec
/// §1 names for this kernel outside the core sieve loop ("used by
/// Pollard-rho, Miller–Rabin, and QS trial-division of residues"). Returns
/// `None` if `n` doesn't split into exactly two primes within `bound`.
pub fn pollard_rho_split_u64(n: u64, bound: u64) -> Option<(u64, u64)> {
    if n < 4 || is_prime_u64(n) {
        return None;
    }
    let d = pollard_rho_factor(n)?;
    let other = n / d;
    if d > 1 && d < n && d <= bound && other <= bound && is_prime_u64(d) && is_prime_u64(other) {
        Some((d.min(other), d.max(other)))
    } else {
        None
    }
}

fn pollard_rho_factor(n: u64) -> Option<u64> {
    if n % 2 == 0 {
        return Some(2);
    }
    for c in 1..9u64 {
        if let Some(d) = pollard_rho_attempt(n, c) {
            return Some(d);
        }
    }
    None
}

/// One Floyd's-cycle Pollard rho attempt with polynomial `f(x) = x^2 + c`.
///
/// `n` is odd here (the even case is short-circuited in `pollard_rho_factor`),
/// so the whole iteration runs in Montgomery residue space: `multiply`/`add`
/// on residues track the same sequence `mod n` as the plain arithmetic would,
/// and since `R = 2^64` is a unit mod odd `n`, `gcd(residue_diff, n) ==
/// gcd(actual_diff, n)` — no need to convert back out of Montgomery form
/// until a nontrivial divisor is found.
fn pollard_rho_attempt(n: u64, c: u64) -> Option<u64> {
    let reducer = MontgomeryU64::new(n);
    let c_res = reducer.to_residue(c % n);
    let f = |x: u64| reducer.add(reducer.multiply(x, x), c_res);

    let mut x = reducer.to_residue(2);
    let mut y = x;
    let mut d = 1u64;
    while d == 1 {
        x = f(x);
        y = f(f(y));
        if x == y {
            return None;
        }
        let diff = if x > y { x - y } else { y - x };
        d = gcd_u64(diff, n);
    }
    if d != n {
        Some(d)
    } else {
        None
    }
}

fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_mod_u64_matches_checked_exponentiation() {
        for &m in &[97u64, 1_000_000_007, 999_999_999_999_999_989] {
            for a in 1..10u64 {
                for e in [0u64, 1, 2, 13, 1000] {
                    let mut expected = 1u128;
                    let mut base = (a % m) as u128;
                    let mut exp = e;
                    while exp > 0 {
                        if exp & 1 == 1 {
                            expected = expected * base % m as u128;
                        }
                        base = base * base % m as u128;
                        exp >>= 1;
                    }
                    assert_eq!(pow_mod_u64(a, e, m), expected as u64, "a={a} e={e} m={m}");
                }
            }
        }
    }

    #[test]
    fn pow_mod_u64_handles_even_modulus() {
        assert_eq!(pow_mod_u64(3, 4, 100), 81);
        assert_eq!(pow_mod_u64(7, 3, 10), 3);
    }

    #[test]
    fn is_prime_u64_matches_known_primes() {
        let primes = [2u64, 3, 5, 7, 11, 13, 97, 7919, 1_000_000_007, 999_999_999_999_999_989];
        for p in primes {
            assert!(is_prime_u64(p), "{p} should be prime");
        }
    }

    #[test]
    fn is_prime_u64_rejects_composites() {
        let composites = [0u64, 1, 4, 6, 8, 9, 15, 21, 1_000_000_006, 341_550_071_728_321];
        for c in composites {
            assert!(!is_prime_u64(c), "{c} should be composite");
        }
    }

    #[test]
    fn is_prime_u64_matches_trial_division_small_range() {
        for n in 2u64..5000 {
            let trial = (2u64..n).take_while(|&d| d * d <= n).all(|d| n % d != 0)
                && (2..n).all(|d| d * d > n || n % d != 0);
            assert_eq!(is_prime_u64(n), trial, "n={n}");
        }
    }

    #[test]
    fn is_probably_prime_matches_known_values() {
        use rug::ops::Pow;
        assert!(is_probably_prime(&Integer::from(1_000_000_007u64), 25));
        assert!(!is_probably_prime(&Integer::from(1_000_000_008u64), 25));
        let mersenne31 = Integer::from(2u32).pow(31) - 1u32;
        assert!(is_probably_prime(&mersenne31, 25));
    }

    #[test]
    fn has_small_factor_detects_and_passes_through_primes() {
        let small_primes = [2u32, 3, 5, 7, 11];
        assert!(has_small_factor(&Integer::from(21u32), &small_primes));
        assert!(!has_small_factor(&Integer::from(13u32), &small_primes));
        assert!(!has_small_factor(&Integer::from(3u32), &small_primes));
    }

    #[test]
    fn pollard_rho_split_finds_two_primes_within_bound() {
        // 101 * 103 = 10403, both primes comfortably under bound 200.
        let (p, q) = pollard_rho_split_u64(10403, 200).expect("should split");
        assert_eq!((p, q), (101, 103));
    }

    #[test]
    fn pollard_rho_split_rejects_primes_above_bound() {
        // 101 * 10007: 10007 exceeds the bound, so no split should be reported.
        assert_eq!(pollard_rho_split_u64(101 * 10007, 200), None);
    }

    #[test]
    fn pollard_rho_split_rejects_a_prime_input() {
        assert_eq!(pollard_rho_split_u64(104729, 1_000_000), None);
    }
}
