//! Property-based tests for qsieve's arithmetic kernel.
//!
//! These use `proptest` to verify algebraic invariants hold across randomly
//! generated inputs, cross-checking the crate's fixed-width/Montgomery
//! arithmetic against `rug`'s arbitrary-precision routines.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test property_tests
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```

use proptest::prelude::*;
use rug::ops::Pow;
use rug::Integer;

use qsieve::modular::{inv_mod_u64, jacobi_u64, modular_sqrt};
use qsieve::montgomery::{MontgomeryU64, Reducer};
use qsieve::uint128::U128;

// == Fixed-width modular arithmetic ============================================

proptest! {
    /// `U128::powmod(base, exp, modulus) == base^exp mod modulus`, cross-checked
    /// against `rug`'s arbitrary-precision `pow_mod`. This is the primitive every
    /// other modular routine in the crate (Miller-Rabin, Pollard's rho,
    /// Montgomery setup) ultimately bottoms out in.
    #[test]
    fn prop_u128_powmod_matches_big_int(
        base in 1u64..1_000_000,
        exp in 0u64..1000,
        modulus in 2u64..1_000_000_000,
    ) {
        let got = U128::powmod(base, exp, modulus);
        let expected = {
            let b = Integer::from(base % modulus);
            let m = Integer::from(modulus);
            let e = Integer::from(exp);
            b.pow_mod(&e, &m).unwrap().to_u64().unwrap()
        };
        prop_assert_eq!(got, expected, "powmod({}, {}, {})", base, exp, modulus);
    }

    /// `U128::mulmod` is commutative.
    #[test]
    fn prop_u128_mulmod_commutative(
        a in 0u64..u64::MAX,
        b in 0u64..u64::MAX,
        modulus in 1u64..u64::MAX,
    ) {
        prop_assert_eq!(U128::mulmod(a, b, modulus), U128::mulmod(b, a, modulus));
    }
}

// == Montgomery reduction =======================================================

proptest! {
    /// Montgomery domain roundtrip: `from_residue(to_residue(a)) == a mod m`.
    #[test]
    fn prop_montgomery_roundtrip(
        m_half in 1u64..10_000_000,
        a in 0u64..1_000_000_000,
    ) {
        let m = 2 * m_half + 1; // odd modulus
        let ctx = MontgomeryU64::new(m);
        let r = ctx.to_residue(a % m);
        prop_assert_eq!(ctx.from_residue(r), a % m);
    }

    /// Montgomery `pow` matches the plain `U128::powmod` result for the same
    /// odd modulus.
    #[test]
    fn prop_montgomery_pow_matches_u128_powmod(
        m_half in 1u64..1_000_000,
        base in 1u64..100_000,
        exp in 0u64..200,
    ) {
        let m = 2 * m_half + 1;
        let ctx = MontgomeryU64::new(m);
        let got = ctx.from_residue(ctx.pow(ctx.to_residue(base % m), exp));
        let expected = U128::powmod(base, exp, m);
        prop_assert_eq!(got, expected, "base={} exp={} m={}", base, exp, m);
    }
}

// == Modular inverse, Jacobi symbol, Tonelli-Shanks ============================

proptest! {
    /// `a * inv_mod_u64(a, p) == 1 (mod p)` whenever `p` is one of a fixed set
    /// of small primes (guaranteeing the inverse exists for any `a` in `[1, p)`).
    #[test]
    fn prop_inv_mod_roundtrip(
        p_idx in 0usize..20,
        a_mul in 1u64..10_000,
    ) {
        let small_primes = [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29,
                             31, 37, 41, 43, 47, 53, 59, 61, 67, 71];
        let p = small_primes[p_idx];
        let a = (a_mul % (p - 1)) + 1;
        let inv = inv_mod_u64(a, p).expect("coprime by construction");
        prop_assert_eq!((a * inv) % p, 1);
    }

    /// Jacobi symbol is multiplicative: `jacobi(a*b, n) == jacobi(a, n) * jacobi(b, n)`
    /// for odd `n`.
    #[test]
    fn prop_jacobi_multiplicative(
        a in 1i64..10_000,
        b in 1i64..10_000,
        n_half in 1u64..5_000,
    ) {
        let n = 2 * n_half + 1;
        let j_a = jacobi_u64(a, n);
        let j_b = jacobi_u64(b, n);
        let j_ab = jacobi_u64(a * b, n);
        prop_assert_eq!(j_ab, j_a * j_b, "a={a} b={b} n={n}");
    }

    /// Whenever `modular_sqrt` returns a root, squaring it reproduces `n mod p`.
    #[test]
    fn prop_modular_sqrt_roots_square_back(
        n in 0u64..10_000,
        p_idx in 0usize..20,
    ) {
        let small_primes = [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29,
                             31, 37, 41, 43, 47, 53, 59, 61, 67, 71];
        let p = small_primes[p_idx];
        if let Some(r) = modular_sqrt(n, p) {
            prop_assert_eq!((r * r) % p, n % p, "n={n} p={p} r={r}");
        }
    }
}

// == Integer square root =========================================================

proptest! {
    /// `integer_sqrt(n)` satisfies `r*r <= n < (r+1)*(r+1)` for nonnegative `n`.
    #[test]
    fn prop_integer_sqrt_postcondition(n in 0u64..u64::MAX) {
        let n = Integer::from(n);
        let r = qsieve::modular::integer_sqrt(&n);
        prop_assert!(r.clone() * r.clone() <= n);
        let r1 = r + 1;
        prop_assert!(r1.clone() * r1 > n);
    }
}
