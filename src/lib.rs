//! # qsieve — self-initializing quadratic sieve
//!
//! A library implementation of the self-initializing quadratic sieve (SIQS)
//! for splitting a composite integer into two nontrivial factors, and a
//! convenience `factor` wrapper that recurses down to a full prime
//! factorization.
//!
//! ## Module organization
//!
//! **Arithmetic kernel:**
//! - [`uint128`] — fixed-width 128-bit integer for the `mulmod`/Montgomery hot path
//! - [`montgomery`] — Montgomery and native `u64` modular reducers behind the [`montgomery::Reducer`] trait
//! - [`modular`] — Jacobi symbol, Tonelli-Shanks square root, modular inverse, integer roots
//! - [`primality`] — deterministic 64-bit Miller-Rabin, `rug`-backed big-integer primality, Pollard's rho
//!
//! **Sieve pipeline:**
//! - [`factor_base`] — digit-count-driven factor-base sizing and construction
//! - [`sieve`] — block-parallel smooth-value discovery
//! - [`relations`] — relation store and partial-relation cycle closing
//! - [`matrix`] — sparse structured Gaussian elimination over GF(2)
//! - [`reconstruct`] — congruence-of-squares factor extraction
//!
//! **Orchestration:**
//! - [`driver`] — the public [`find_divisor`]/[`factor`] entry points
//! - [`config`] — runtime tuning knobs
//! - [`error`] — the library-boundary error type
//!
//! ## Design
//!
//! Every stage communicates through plain data (`Relation`, `FactorBasePrime`,
//! null-space index vectors) rather than shared mutable state, except for the
//! sieve's relation store, which is explicitly a `Mutex`-serialized
//! accumulator shared by worker threads. See `DESIGN.md` for the rationale
//! behind each module's shape.

pub mod config;
pub mod driver;
pub mod error;
pub mod factor_base;
pub mod matrix;
pub mod modular;
pub mod montgomery;
pub mod primality;
pub mod reconstruct;
pub mod relations;
pub mod sieve;
pub mod uint128;

pub use config::Config;
pub use driver::{factor, factor_with_config, find_divisor};
pub use error::{PartialProgress, QsError, Result};
