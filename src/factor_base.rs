//! Factor-base construction (spec §4.E), grounded on the teacher's segmented
//! prime sieve (`sieve::generate_primes`, wheel-30) generalized to stream
//! primes via a Jacobi-symbol filter instead of collecting every prime up
//! to a bound.

use crate::modular;
use rug::Integer;

/// One entry of the factor base: a prime `p` with `(n/p) = 1`, its two
/// square roots of `n mod p`, and its integer-log weight (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct FactorBasePrime {
    pub p: u32,
    /// `r_plus^2 ≡ n (mod p)`.
    pub r_plus: u32,
    /// `p - r_plus`.
    pub r_minus: u32,
    /// `ceil(10 * ln(p))`, an integer log-weight sized so 16-bit sieve
    /// counters (spec §4.F) can accumulate many hits before overflowing.
    pub log_p: u16,
}

/// Anchors of the digit-count → factor-base-size table (spec §4.E),
/// `(decimal_digits, B)`. Linear interpolation between anchors, linear
/// extrapolation beyond the last one.
const SIZE_TABLE: [(u32, u32); 9] = [
    (1, 2),
    (6, 5),
    (10, 30),
    (20, 60),
    (30, 500),
    (40, 1200),
    (50, 5000),
    (60, 12000),
    (90, 60000),
];

/// Looks up the recommended factor-base size `B` for an `n` with the given
/// decimal digit count (spec §4.E).
pub fn recommended_size(decimal_digits: u32) -> usize {
    let (d0, b0) = SIZE_TABLE[0];
    if decimal_digits <= d0 {
        return b0 as usize;
    }
    for window in SIZE_TABLE.windows(2) {
        let (d_lo, b_lo) = window[0];
        let (d_hi, b_hi) = window[1];
        if decimal_digits <= d_hi {
            let span = (d_hi - d_lo) as f64;
            let frac = (decimal_digits - d_lo) as f64 / span;
            let b = b_lo as f64 + frac * (b_hi as f64 - b_lo as f64);
            return b.ceil() as usize;
        }
    }
    // Beyond the last anchor: extrapolate using the slope of the final
    // segment.
    let (d_prev, b_prev) = SIZE_TABLE[SIZE_TABLE.len() - 2];
    let (d_last, b_last) = SIZE_TABLE[SIZE_TABLE.len() - 1];
    let slope = (b_last as f64 - b_prev as f64) / (d_last - d_prev) as f64;
    let b = b_last as f64 + slope * (decimal_digits - d_last) as f64;
    b.ceil().max(b_last as f64) as usize
}

/// Integer base-10 digit count of `n`, used to look up [`recommended_size`].
pub fn decimal_digits(n: &Integer) -> u32 {
    if *n == 0 {
        return 1;
    }
    n.clone().abs().to_string_radix(10).len() as u32
}

/// Streaming segmented sieve of Eratosthenes over `u32` candidates, used to
/// feed the factor-base builder without ever materializing a bound larger
/// than needed (spec §4.E "stream primes"). Adapted from the teacher's
/// `sieve::generate_primes`, but as a pull-based iterator so the factor-base
/// builder can stop as soon as it has `B` accepted primes.
pub struct SegmentedPrimeStream {
    segment_size: u32,
    segment_start: u64,
    buffer: Vec<u32>,
    cursor: usize,
    base_primes: Vec<u32>,
    base_limit: u32,
}

impl SegmentedPrimeStream {
    pub fn new() -> Self {
        SegmentedPrimeStream {
            segment_size: 1 << 16,
            segment_start: 2,
            buffer: Vec::new(),
            cursor: 0,
            base_primes: Vec::new(),
            base_limit: 0,
        }
    }

    fn sieve_segment(&mut self) {
        let lo = self.segment_start;
        let hi = lo + self.segment_size as u64;

        // Grow the base-prime list (primes up to sqrt(hi)) with simple
        // trial division, mirroring the teacher's bootstrap phase.
        let needed_limit = (hi as f64).sqrt() as u32 + 1;
        if needed_limit > self.base_limit {
            let start = self.base_limit.max(2);
            for candidate in start..=needed_limit {
                if self
                    .base_primes
                    .iter()
                    .take_while(|&&p| (p as u64) * (p as u64) <= candidate as u64)
                    .all(|&p| candidate % p != 0)
                {
                    self.base_primes.push(candidate);
                }
            }
            self.base_limit = needed_limit;
        }

        let mut is_prime = vec![true; self.segment_size as usize];
        for &p in &self.base_primes {
            if (p as u64) * (p as u64) > hi {
                break;
            }
            let mut start = ((lo + p as u64 - 1) / p as u64) * p as u64;
            if start < p as u64 * p as u64 {
                start = p as u64 * p as u64;
            }
            let mut j = start;
            while j < hi {
                is_prime[(j - lo) as usize] = false;
                j += p as u64;
            }
        }

        self.buffer.clear();
        for (i, &flag) in is_prime.iter().enumerate() {
            let v = lo + i as u64;
            if flag && v >= 2 {
                self.buffer.push(v as u32);
            }
        }
        self.cursor = 0;
        self.segment_start = hi;
    }
}

impl Default for SegmentedPrimeStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for SegmentedPrimeStream {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if self.cursor < self.buffer.len() {
                let v = self.buffer[self.cursor];
                self.cursor += 1;
                return Some(v);
            }
            self.sieve_segment();
            if self.buffer.is_empty() && self.segment_start > (u32::MAX as u64) {
                return None;
            }
        }
    }
}

/// Build a factor base of (up to) `target_size` primes satisfying
/// `jacobi(n, p) = 1` (spec §4.E): `p = 2` is always included first when `n`
/// is odd, then odd primes are streamed and filtered.
pub fn build_factor_base(n: &Integer, target_size: usize) -> Vec<FactorBasePrime> {
    let mut out = Vec::with_capacity(target_size);
    if target_size == 0 {
        return out;
    }

    if n.is_odd() {
        let n_mod_2 = 1u32;
        out.push(FactorBasePrime {
            p: 2,
            r_plus: n_mod_2,
            r_minus: 2 - n_mod_2,
            log_p: log_weight(2),
        });
    }

    for p in SegmentedPrimeStream::new() {
        if out.len() >= target_size {
            break;
        }
        if p == 2 {
            continue;
        }
        if modular::jacobi_u64(n.mod_u(p) as i64, p as u64) != 1 {
            continue;
        }
        let n_mod_p = n.mod_u(p) as u64;
        let r = match modular::modular_sqrt(n_mod_p, p as u64) {
            Some(r) => r as u32,
            None => continue, // shouldn't happen given the Jacobi filter
        };
        out.push(FactorBasePrime {
            p,
            r_plus: r,
            r_minus: p - r,
            log_p: log_weight(p),
        });
    }

    out
}

/// `ceil(10 * ln(p))`, spec §3's integer-log weight.
fn log_weight(p: u32) -> u16 {
    let w = (10.0 * (p as f64).ln()).ceil();
    w as u16
}
