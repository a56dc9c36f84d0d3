//! Montgomery reduction (spec §4.C).
//!
//! `MontgomeryU64` is adapted directly from the teacher's `sieve::MontgomeryCtx`
//! (Hensel-lifted `-m^-1 mod 2^64`, REDC via a single `u128` accumulator) — it
//! is the reducer the sieve engine actually calls on every inner-loop
//! residue, since factor-base primes, Tonelli-Shanks moduli, and
//! partial-relation cofactor checks all fit in `u64` for the sizes this
//! crate targets (spec §1, ~120 digits). `NativeU64` is the fallback for
//! moduli Montgomery form can't represent (even modulus, or `m == 1`):
//! spec §9's "Polymorphism over reducers" note calls out exactly this
//! Montgomery/Native split so callers can pick a reducer by capability
//! rather than branching on modulus parity themselves.
//!
//! Both share the [`Reducer`] capability trait: the sieve depends only on
//! the capability set, not on which concrete reducer backs it.

use crate::uint128::U128;

/// Capability set a modular-arithmetic consumer needs from a reducer,
/// independent of whether it's backed by Montgomery form or plain
/// arithmetic (spec §9).
pub trait Reducer {
    type Residue: Copy + PartialEq;

    fn to_residue(&self, a: u64) -> Self::Residue;
    fn from_residue(&self, r: Self::Residue) -> u64;
    fn multiply(&self, a: Self::Residue, b: Self::Residue) -> Self::Residue;
    fn square(&self, a: Self::Residue) -> Self::Residue {
        self.multiply(a, a)
    }
    fn add(&self, a: Self::Residue, b: Self::Residue) -> Self::Residue;
    fn sub(&self, a: Self::Residue, b: Self::Residue) -> Self::Residue;
    fn equals(&self, a: Self::Residue, b: Self::Residue) -> bool {
        a == b
    }
    fn one(&self) -> Self::Residue;
    fn pow(&self, base: Self::Residue, mut exp: u64) -> Self::Residue {
        let mut result = self.one();
        let mut b = base;
        while exp > 0 {
            if exp & 1 == 1 {
                result = self.multiply(result, b);
            }
            exp >>= 1;
            if exp > 0 {
                b = self.square(b);
            }
        }
        result
    }
}

/// Montgomery reducer for a fixed odd `u64` modulus `m > 1`.
///
/// Invariant: every `Residue` value lies in `[0, m)` and represents
/// `a * R mod m` for `R = 2^64`.
#[derive(Clone, Copy, Debug)]
pub struct MontgomeryU64 {
    m: u64,
    m_prime: u64,   // -m^-1 mod 2^64
    r_mod_m: u64,   // R mod m (Montgomery form of 1)
    r2_mod_m: u64,  // R^2 mod m
}

impl MontgomeryU64 {
    /// Construct a reducer for odd modulus `m > 1`.
    pub fn new(m: u64) -> Self {
        debug_assert!(m > 1 && m & 1 == 1, "Montgomery requires an odd modulus > 1");

        // Hensel lifting: m^-1 mod 2^64 via 6 Newton iterations, each
        // doubling the number of correct bits starting from 1 (spec §4.C).
        let mut inv: u64 = 1;
        for _ in 0..6 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(m.wrapping_mul(inv)));
        }
        let m_prime = inv.wrapping_neg();

        let r_mod_m = ((1u128 << 64) % m as u128) as u64;
        let r2_mod_m = ((r_mod_m as u128 * r_mod_m as u128) % m as u128) as u64;

        MontgomeryU64 {
            m,
            m_prime,
            r_mod_m,
            r2_mod_m,
        }
    }

    #[inline]
    pub fn modulus(&self) -> u64 {
        self.m
    }

    /// REDC: `t * R^-1 mod m` for `t < m * R`.
    ///
    /// `t + q*m` can reach just under `2*m*R`, which overflows `u128` once
    /// `m` exceeds roughly `2^63` — tracked explicitly via `overflowing_add`
    /// instead of relying on `u128` headroom alone.
    #[inline]
    fn reduce(&self, t: u128) -> u64 {
        let q = (t as u64).wrapping_mul(self.m_prime);
        let qm = (q as u128) * (self.m as u128);
        let (sum, overflow) = t.overflowing_add(qm);
        let mut hi = sum >> 64;
        if overflow {
            hi += 1u128 << 64;
        }
        let m = self.m as u128;
        if hi >= m {
            hi -= m;
        }
        hi as u64
    }

    /// Modular inverse of a residue via Fermat's little theorem; requires
    /// `m` prime. Returns `None` if `a ≡ 0 (mod m)`.
    pub fn mod_inverse(&self, a: u64) -> Option<u64> {
        if a == 0 {
            return None;
        }
        Some(self.pow(a, self.m - 2))
    }
}

impl Reducer for MontgomeryU64 {
    type Residue = u64;

    #[inline]
    fn to_residue(&self, a: u64) -> u64 {
        self.reduce((a % self.m) as u128 * self.r2_mod_m as u128)
    }

    #[inline]
    fn from_residue(&self, r: u64) -> u64 {
        self.reduce(r as u128)
    }

    #[inline]
    fn multiply(&self, a: u64, b: u64) -> u64 {
        self.reduce(a as u128 * b as u128)
    }

    #[inline]
    fn add(&self, a: u64, b: u64) -> u64 {
        U128::mod_add(a, b, self.m)
    }

    #[inline]
    fn sub(&self, a: u64, b: u64) -> u64 {
        U128::mod_sub(a, b, self.m)
    }

    #[inline]
    fn one(&self) -> u64 {
        self.r_mod_m
    }
}

/// Fallback reducer with no Montgomery transform: residues are plain values
/// in `[0, m)` and every operation goes through [`U128`]'s already-tested
/// `mulmod`/`mod_add`/`mod_sub`. Used when `m` is even (REDC requires an odd
/// modulus) or otherwise not worth lifting into Montgomery form — spec §9's
/// "Polymorphism over reducers" note names this as the `Native64` member of
/// the reducer capability set, alongside Montgomery.
#[derive(Clone, Copy, Debug)]
pub struct NativeU64 {
    m: u64,
}

impl NativeU64 {
    pub fn new(m: u64) -> Self {
        debug_assert!(m > 0, "modulus must be nonzero");
        NativeU64 { m }
    }

    #[inline]
    pub fn modulus(&self) -> u64 {
        self.m
    }
}

impl Reducer for NativeU64 {
    type Residue = u64;

    #[inline]
    fn to_residue(&self, a: u64) -> u64 {
        a % self.m
    }

    #[inline]
    fn from_residue(&self, r: u64) -> u64 {
        r
    }

    #[inline]
    fn multiply(&self, a: u64, b: u64) -> u64 {
        U128::mulmod(a, b, self.m)
    }

    #[inline]
    fn add(&self, a: u64, b: u64) -> u64 {
        U128::mod_add(a, b, self.m)
    }

    #[inline]
    fn sub(&self, a: u64, b: u64) -> u64 {
        U128::mod_sub(a, b, self.m)
    }

    #[inline]
    fn one(&self) -> u64 {
        1 % self.m
    }
}

/// Selects a [`MontgomeryU64`] for odd `m > 1`, or falls back to
/// [`NativeU64`] otherwise, hiding the branch behind a common enum so
/// callers that don't care which backend they got can still use
/// [`Reducer`]'s default-method `pow`.
#[derive(Clone, Copy, Debug)]
pub enum AnyReducer64 {
    Montgomery(MontgomeryU64),
    Native(NativeU64),
}

impl AnyReducer64 {
    pub fn for_modulus(m: u64) -> Self {
        if m > 1 && m & 1 == 1 {
            AnyReducer64::Montgomery(MontgomeryU64::new(m))
        } else {
            AnyReducer64::Native(NativeU64::new(m))
        }
    }
}

impl Reducer for AnyReducer64 {
    type Residue = u64;

    fn to_residue(&self, a: u64) -> u64 {
        match self {
            AnyReducer64::Montgomery(ctx) => ctx.to_residue(a),
            AnyReducer64::Native(ctx) => ctx.to_residue(a),
        }
    }

    fn from_residue(&self, r: u64) -> u64 {
        match self {
            AnyReducer64::Montgomery(ctx) => ctx.from_residue(r),
            AnyReducer64::Native(ctx) => ctx.from_residue(r),
        }
    }

    fn multiply(&self, a: u64, b: u64) -> u64 {
        match self {
            AnyReducer64::Montgomery(ctx) => ctx.multiply(a, b),
            AnyReducer64::Native(ctx) => ctx.multiply(a, b),
        }
    }

    fn add(&self, a: u64, b: u64) -> u64 {
        match self {
            AnyReducer64::Montgomery(ctx) => ctx.add(a, b),
            AnyReducer64::Native(ctx) => ctx.add(a, b),
        }
    }

    fn sub(&self, a: u64, b: u64) -> u64 {
        match self {
            AnyReducer64::Montgomery(ctx) => ctx.sub(a, b),
            AnyReducer64::Native(ctx) => ctx.sub(a, b),
        }
    }

    fn one(&self) -> u64 {
        match self {
            AnyReducer64::Montgomery(ctx) => ctx.one(),
            AnyReducer64::Native(ctx) => ctx.one(),
        }
    }
}
