//! Top-level driver (spec §6's external interface): `find_divisor` runs one
//! self-initializing quadratic sieve attempt to completion; `factor` wraps
//! it in the small-prime/perfect-power pre-filtering a caller would
//! normally do before ever dispatching to QS (spec §1 lists these as
//! external collaborators, but `factor` is this crate's own convenience
//! entry point, so it does that filtering itself rather than punting it to
//! *its* caller).

use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use rug::ops::Pow;
use rug::Integer;

use crate::config::Config;
use crate::error::{require_composite_input, PartialProgress, QsError, Result};
use crate::factor_base::{self, SegmentedPrimeStream};
use crate::matrix::NullSpaceVectors;
use crate::modular;
use crate::primality;
use crate::reconstruct;
use crate::relations::RelationStore;
use crate::sieve::{self, SieveProgress};

/// Upper bound (inclusive) on the primes `factor` trial-divides by before
/// dispatching the remaining cofactor to QS. Kept small: this is a
/// convenience pre-filter, not a general-purpose trial-division routine
/// (that's explicitly out of scope per spec.md §1).
const SMALL_PRIME_TRIAL_BOUND: u32 = 100_000;

/// How many times [`find_divisor`] re-enters the sieve loop with a larger
/// factor base before giving up (spec §5 "Timeouts": hitting the wall-clock
/// budget is "equivalent to cancellation followed by a retry with a larger
/// factor base"; the same retry applies when the matrix phase's null-space
/// search is exhausted without a usable factor).
const MAX_SIEVE_ATTEMPTS: usize = 4;

/// Finds a nontrivial divisor of composite `n` via self-initializing
/// quadratic sieve (spec §6). Precondition: `n > 1` and `n` composite.
pub fn find_divisor(n: &Integer, config: &Config) -> Result<Integer> {
    require_composite_input(n)?;
    if n.is_even() {
        return Ok(Integer::from(2));
    }

    let multiplier = Integer::from(config.multiplier.max(1));
    let mut last_progress = PartialProgress::default();

    for attempt in 0..MAX_SIEVE_ATTEMPTS {
        let n_eff = Integer::from(n * &multiplier);
        let digit_count = factor_base::decimal_digits(&n_eff);
        let base_size = config
            .factor_base_size
            .unwrap_or_else(|| factor_base::recommended_size(digit_count));
        // Widen the factor base on each retry (spec §5 Timeouts).
        let target_size = base_size + attempt * (base_size / 2).max(1);

        tracing::info!(
            digits = digit_count,
            factor_base_size = target_size,
            attempt,
            "starting quadratic sieve attempt"
        );

        let factor_base = factor_base::build_factor_base(&n_eff, target_size);
        let mut x0 = modular::integer_sqrt(&n_eff);
        if Integer::from(&x0 * &x0) < n_eff {
            x0 += 1;
        }

        let store = Mutex::new(RelationStore::new(factor_base.len(), n.clone()));
        let progress = SieveProgress::new(config.reporting_interval);
        let cancel = AtomicBool::new(false);

        let outcome = sieve::run_sieve(&factor_base, &n_eff, &x0, config, &store, &progress, &cancel);
        let relations = store.into_inner().expect("mutex not poisoned");

        last_progress = PartialProgress {
            relations_found: relations.full_count(),
            relations_needed: factor_base.len() + config.clamped_surplus(),
            windows_sieved: progress.windows_sieved.load(std::sync::atomic::Ordering::Relaxed),
            candidates_tested: progress
                .candidates_tested
                .load(std::sync::atomic::Ordering::Relaxed),
        };

        if !outcome.stopped_for_enough && !outcome.stopped_for_timeout {
            return Err(QsError::Cancelled(last_progress));
        }

        let vectors = NullSpaceVectors::compute(relations.full_relations(), factor_base.len(), config.merge_limit);
        if let Some(d) = reconstruct::find_factor_from_vectors(relations.full_relations(), vectors, n) {
            return Ok(d);
        }

        tracing::warn!(
            attempt,
            relations = last_progress.relations_found,
            "null-space search exhausted without a nontrivial factor; retrying with a larger factor base"
        );
    }

    Err(QsError::InsufficientRelations(last_progress))
}

/// Returns the multiset of prime factors of `n`, sorted ascending (spec
/// §6). `factor(1)` is empty; `factor(p)` for prime `p` is `[p]`.
pub fn factor(n: &Integer) -> Result<Vec<Integer>> {
    let mut out = Vec::new();
    factor_into(n.clone(), &mut out, &Config::default())?;
    out.sort();
    Ok(out)
}

/// Same as [`factor`] but with caller-supplied QS tuning, used when the
/// default `Config` isn't appropriate (e.g. a fixed thread count or time
/// budget for a batch job).
pub fn factor_with_config(n: &Integer, config: &Config) -> Result<Vec<Integer>> {
    let mut out = Vec::new();
    factor_into(n.clone(), &mut out, config)?;
    out.sort();
    Ok(out)
}

fn factor_into(mut n: Integer, out: &mut Vec<Integer>, config: &Config) -> Result<()> {
    if n <= 1 {
        return Ok(());
    }

    for p in SegmentedPrimeStream::new() {
        if p > SMALL_PRIME_TRIAL_BOUND {
            break;
        }
        while n.is_divisible_u(p) {
            n /= p;
            out.push(Integer::from(p));
        }
        if n == 1 {
            return Ok(());
        }
    }

    if primality::is_probably_prime(&n, 25) {
        out.push(n);
        return Ok(());
    }

    if let Some((root, exponent)) = perfect_power_factor(&n) {
        for _ in 0..exponent {
            factor_into(root.clone(), out, config)?;
        }
        return Ok(());
    }

    let d = find_divisor(&n, config)?;
    let other = Integer::from(&n / &d);
    factor_into(d, out, config)?;
    factor_into(other, out, config)?;
    Ok(())
}

/// `n = root^exponent` for some `root > 1`, `exponent >= 2` (spec §4.B
/// perfect-power pre-filter, invoked here since `factor` is this crate's
/// own top-level entry point rather than an external caller).
fn perfect_power_factor(n: &Integer) -> Option<(Integer, u32)> {
    let bits = n.significant_bits();
    for k in (2..=bits).rev() {
        let r = modular::integer_nth_root(n, k);
        if r > 1 && r.clone().pow(k) == *n {
            return Some((r, k));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_of_one_is_empty() {
        assert_eq!(factor(&Integer::from(1)).unwrap(), Vec::<Integer>::new());
    }

    #[test]
    fn factor_of_a_prime_is_itself() {
        assert_eq!(factor(&Integer::from(104729)).unwrap(), vec![Integer::from(104729)]);
    }

    #[test]
    fn factor_of_a_power_of_two() {
        let n = Integer::from(1u64) << 20;
        let result = factor(&n).unwrap();
        assert_eq!(result.len(), 20);
        assert!(result.iter().all(|p| *p == 2));
    }

    #[test]
    fn factor_of_a_small_semiprime() {
        let n = Integer::from(101u64 * 103);
        let result = factor(&n).unwrap();
        assert_eq!(result, vec![Integer::from(101), Integer::from(103)]);
    }

    #[test]
    fn factor_product_reconstructs_n() {
        let n = Integer::from(10_403u64 * 7); // 101 * 103 * 7
        let result = factor(&n).unwrap();
        let product: Integer = result.iter().fold(Integer::from(1), |acc, p| acc * p);
        assert_eq!(product, n);
        assert!(result.iter().all(|p| primality::is_probably_prime(p, 25)));
    }

    #[test]
    fn perfect_power_detection_splits_correctly() {
        let n = Integer::from(1024); // 2^10
        let (root, exp) = perfect_power_factor(&n).unwrap();
        assert_eq!(root, Integer::from(2));
        assert_eq!(exp, 10);
    }

    #[test]
    fn find_divisor_rejects_n_less_equal_one() {
        let config = Config::default();
        assert!(find_divisor(&Integer::from(1), &config).is_err());
        assert!(find_divisor(&Integer::from(0), &config).is_err());
    }

    #[test]
    fn find_divisor_returns_a_nontrivial_factor_of_a_semiprime() {
        let n = Integer::from(10_023_859_281_455_311_421u64);
        let config = Config {
            interval_size: 20_000,
            threads: 1,
            sieve_time_limit: Some(std::time::Duration::from_secs(30)),
            ..Config::default()
        };
        let d = find_divisor(&n, &config).expect("should find a factor");
        assert!(d > 1 && d < n);
        assert_eq!(Integer::from(&n % &d), 0);
    }
}
