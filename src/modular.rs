//! Modular arithmetic primitives shared by factor-base construction and the
//! sieve's polynomial root computation (spec §4.B).
//!
//! Grounded on the teacher's `sieve::mod_inverse`/`sieve::factor_u64` (binary
//! extended-Euclid shape, `u64` domain) generalized to the `rug::Integer`
//! domain the factor base and relation reconstruction actually operate on.

use rug::ops::Pow;
use rug::Integer;

/// Jacobi symbol `(a/n)` for odd `n > 0`, via the quadratic-reciprocity
/// recursion (spec §4.B). Returns `-1`, `0`, or `1`.
pub fn jacobi(a: &Integer, n: &Integer) -> i32 {
    debug_assert!(n.is_odd() && *n > 0, "jacobi requires odd n > 0");

    let mut a = a.clone().rem_euc(n.clone());
    let mut n = n.clone();
    let mut result = 1i32;

    while a != 0 {
        while a.is_even() {
            a >>= 1;
            let r = n.mod_u(8);
            if r == 3 || r == 5 {
                result = -result;
            }
        }
        std::mem::swap(&mut a, &mut n);
        if a.mod_u(4) == 3 && n.mod_u(4) == 3 {
            result = -result;
        }
        a = a.rem_euc(n.clone());
    }

    if n == 1 {
        result
    } else {
        0
    }
}

/// Jacobi symbol specialized to a `u64` prime modulus, used on the factor-base
/// hot path (one call per candidate prime during sieve setup).
pub fn jacobi_u64(a: i64, p: u64) -> i32 {
    jacobi(&Integer::from(a), &Integer::from(p))
}

/// Tonelli-Shanks: a square root of `n mod p` for prime `p`, if one exists.
/// Returns the smaller of the two roots `{r, p-r}` (spec §4.B tie-break), or
/// `None` if `n` is a quadratic non-residue mod `p`.
pub fn modular_sqrt(n: u64, p: u64) -> Option<u64> {
    let n = n % p;
    if p == 2 {
        return Some(n);
    }
    if n == 0 {
        return Some(0);
    }
    if legendre_u64(n, p) != 1 {
        return None;
    }

    if p % 4 == 3 {
        let r = crate::uint128::U128::powmod(n, (p + 1) / 4, p);
        return Some(r.min(p - r));
    }

    // General case: factor p-1 = q * 2^s with q odd, find a quadratic
    // non-residue z, then iteratively shrink the order of the candidate
    // root's error term (standard Tonelli-Shanks loop).
    let mut q = p - 1;
    let mut s = 0u32;
    while q % 2 == 0 {
        q /= 2;
        s += 1;
    }

    let mut z = 2u64;
    while legendre_u64(z, p) != p - 1 {
        z += 1;
    }

    let mut m = s;
    let mut c = crate::uint128::U128::powmod(z, q, p);
    let mut t = crate::uint128::U128::powmod(n, q, p);
    let mut r = crate::uint128::U128::powmod(n, (q + 1) / 2, p);

    loop {
        if t == 1 {
            return Some(r.min(p - r));
        }
        let mut i = 0u32;
        let mut t2i = t;
        while t2i != 1 {
            t2i = crate::uint128::U128::mulmod(t2i, t2i, p);
            i += 1;
            if i == m {
                // n was not actually a residue; shouldn't happen given the
                // Legendre check above, but fail closed rather than loop.
                return None;
            }
        }
        let b = crate::uint128::U128::powmod(c, 1u64 << (m - i - 1), p);
        m = i;
        c = crate::uint128::U128::mulmod(b, b, p);
        t = crate::uint128::U128::mulmod(t, c, p);
        r = crate::uint128::U128::mulmod(r, b, p);
    }
}

/// Legendre symbol `(a/p)` for odd prime `p`, returned as `0`, `1`, or `p-1`
/// (the multiplicative-group representation Tonelli-Shanks wants, rather
/// than `jacobi`'s signed `{-1,0,1}`).
fn legendre_u64(a: u64, p: u64) -> u64 {
    if a % p == 0 {
        return 0;
    }
    crate::uint128::U128::powmod(a, (p - 1) / 2, p)
}

/// Modular inverse of `a` mod `m` via the extended binary GCD (spec §4.B),
/// generalizing the teacher's `sieve::mod_inverse`. Returns `None` if
/// `gcd(a, m) != 1`.
pub fn inv_mod_u64(a: u64, m: u64) -> Option<u64> {
    if m == 1 {
        return Some(0);
    }
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        let new_r = old_r - q * r;
        old_r = r;
        r = new_r;
        let new_s = old_s - q * s;
        old_s = s;
        s = new_s;
    }
    if old_r != 1 {
        return None;
    }
    let m_i = m as i128;
    Some((((old_s % m_i) + m_i) % m_i) as u64)
}

/// Integer square root `floor(sqrt(n))` via Newton iteration on `rug::Integer`
/// (spec §4.B), with postcondition `r*r <= n < (r+1)*(r+1)`.
pub fn integer_sqrt(n: &Integer) -> Integer {
    n.clone().sqrt()
}

/// Integer `k`-th root `floor(n^(1/k))` with postcondition `r^k <= n <
/// (r+1)^k` (spec §4.B; used to detect and exclude perfect powers before
/// sieving, per the resolved Open Question in SPEC_FULL.md).
pub fn integer_nth_root(n: &Integer, k: u32) -> Integer {
    n.clone().root(k)
}

/// `true` if `n = r^k` for some integer `r > 1` and `k >= 2` (spec §4.B
/// perfect-power pre-filter). Checked up to `k <= bit_length(n)`, beyond
/// which no base `r > 1` can satisfy `r^k <= n`.
pub fn is_perfect_power(n: &Integer) -> bool {
    if *n < 2 {
        return false;
    }
    let bits = n.significant_bits();
    for k in 2..=bits {
        let r = integer_nth_root(n, k);
        if r > 1 && r.clone().pow(k) == *n {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobi_matches_known_values() {
        assert_eq!(jacobi_u64(5, 21), 1);
        assert_eq!(jacobi_u64(6, 21), 0);
        assert_eq!(jacobi_u64(2, 7), 1);
        assert_eq!(jacobi_u64(3, 7), -1);
    }

    #[test]
    fn modular_sqrt_matches_brute_force_small_primes() {
        for &p in &[3u64, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41] {
            for n in 0..p {
                let brute = (0..p).find(|&r| (r * r) % p == n);
                match (brute, modular_sqrt(n, p)) {
                    (None, None) => {}
                    (Some(_), Some(r)) => assert_eq!((r * r) % p, n, "p={p} n={n}"),
                    (a, b) => panic!("mismatch p={p} n={n} brute={a:?} got={b:?}"),
                }
            }
        }
    }

    #[test]
    fn modular_sqrt_returns_smaller_root() {
        // p=13: sqrt(3) should be one of {4, 9}; expect the smaller, 4.
        assert_eq!(modular_sqrt(3, 13), Some(4));
    }

    #[test]
    fn inv_mod_matches_definition() {
        for &(a, m) in &[(3u64, 11u64), (7, 26), (1, 2), (9999991, 1_000_000_007)] {
            let inv = inv_mod_u64(a, m).unwrap();
            assert_eq!((a * inv) % m, 1 % m, "a={a} m={m}");
        }
    }

    #[test]
    fn inv_mod_none_when_not_coprime() {
        assert_eq!(inv_mod_u64(6, 9), None);
    }

    #[test]
    fn integer_sqrt_postcondition_holds() {
        for v in [0u64, 1, 2, 3, 4, 99, 100, 101, 1_000_000] {
            let n = Integer::from(v);
            let r = integer_sqrt(&n);
            assert!(r.clone() * r.clone() <= n);
            let r1 = r.clone() + 1;
            assert!(r1.clone() * r1 > n);
        }
    }

    #[test]
    fn perfect_power_detection() {
        assert!(is_perfect_power(&Integer::from(8)));
        assert!(is_perfect_power(&Integer::from(9)));
        assert!(is_perfect_power(&Integer::from(1024)));
        assert!(!is_perfect_power(&Integer::from(15)));
        assert!(!is_perfect_power(&Integer::from(2)));
    }
}
