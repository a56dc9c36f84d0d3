//! Tunable knobs recognized by the sieve (spec §6).
//!
//! Mirrors the teacher's pattern of a single struct carrying every runtime
//! knob (`cli.rs`'s `Cli`) but as a plain programmatic struct — the CLI
//! surface itself is out of scope for this crate.

/// Runtime configuration for a single [`crate::find_divisor`] invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count. `0` selects hardware parallelism via
    /// `std::thread::available_parallelism`.
    pub threads: usize,

    /// Override for the factor base size `B`. `None` uses the digit-count
    /// table from spec §4.E.
    pub factor_base_size: Option<usize>,

    /// Sieve threshold percent used in `T = floor(logp_scale * percent *
    /// ln|Q(x0)|)` (spec §4.F step 3). Default 85.
    pub lower_bound_percent: u32,

    /// Candidate values per sieve window (spec §4.F "Intervals"). Default
    /// 200_000.
    pub interval_size: usize,

    /// Small odd multiplier `k` prepended to `n` before factor-base
    /// selection, to improve factor-base quality (spec §4.E/§6). Default 1.
    pub multiplier: u64,

    /// Additional calibration knob folded into the threshold computation;
    /// spec.md treats this as empirically-chosen with no documented
    /// invariant beyond "enough candidates, not too many false positives".
    pub threshold_exponent: f64,

    /// Enable combining one-large-prime partial relations into full
    /// relations via cycle detection in the partial-relation graph.
    pub process_partial_relations: bool,

    /// Enable the two-large-prime extension (spec.md §9 Open Question,
    /// resolved in SPEC_FULL.md as an opt-in extension). Requires
    /// `process_partial_relations`.
    pub process_double_partial_relations: bool,

    /// Row-weight cap for the structured-elimination merge pass (spec
    /// §4.H step 2). Default 8 (within the documented 5-10 range).
    pub merge_limit: usize,

    /// Extra relations collected beyond `|factor_base|` before the matrix
    /// phase runs (spec §4.G "enough"). Clamped to [10, 64].
    pub surplus: usize,

    /// Optional wall-clock budget (seconds) for the sieve phase. `None`
    /// means unbounded.
    pub sieve_time_limit: Option<std::time::Duration>,

    /// How often (in windows sieved) progress is logged via `tracing`.
    pub reporting_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            threads: 0,
            factor_base_size: None,
            lower_bound_percent: 85,
            interval_size: 200_000,
            multiplier: 1,
            threshold_exponent: 1.0,
            process_partial_relations: true,
            process_double_partial_relations: false,
            merge_limit: 8,
            surplus: 20,
            sieve_time_limit: None,
            reporting_interval: 50,
        }
    }
}

impl Config {
    /// Resolve `threads` against hardware parallelism, matching spec §5's
    /// "1 for inputs <= 1e10 where overhead outweighs benefit" rule.
    pub fn resolve_threads(&self, n_bits: u32) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        // ~1e10 is about 34 bits.
        if n_bits <= 34 {
            return 1;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn clamped_surplus(&self) -> usize {
        self.surplus.clamp(10, 64)
    }
}
