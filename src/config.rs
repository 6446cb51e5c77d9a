//! Simulator-wide tunables.
//!
//! The source material this crate is modeled on kept `eps` and a retry
//! "precision" threshold as mutable globals. We promote both, plus the
//! scheduler's bisection fraction and retry budget, to a plain
//! configuration struct that is constructed once and threaded explicitly
//! through [`crate::engine::Engine`] and [`crate::scheduler`] — no
//! `static mut`, no process-wide singleton.

/// Tunables governing floating-point tolerance and the scheduler's adaptive
/// bisection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Tolerance used both for proximity checks (lightcone classification,
    /// collision distance) and as the "sufficient precision reached" guard
    /// during [`crate::scheduler`] bisection.
    pub eps: f64,
    /// Maximum number of `RetrySmallerStep` bisections allowed within a
    /// single outer scheduler iteration before failing with
    /// [`crate::errors::SimError::ExcessiveRetries`].
    pub max_retries: u32,
    /// Fraction of the current bisection span used to clamp a retry hint
    /// away from either endpoint (see `spec.md` §4.7 step 4).
    pub hint_clamp_fraction: f64,
}

impl Default for SimConfig {
    /// Design defaults: `eps = 1e-8`, 64 retries, and a 10% clamp fraction.
    ///
    /// Test suites that need looser assertions (the end-to-end scenarios in
    /// `tests/scenarios.rs` compare against closed-form values to several
    /// significant digits) use `SimConfig::with_eps(1e-3)` instead.
    fn default() -> Self {
        SimConfig {
            eps: 1e-8,
            max_retries: 64,
            hint_clamp_fraction: 0.1,
        }
    }
}

impl SimConfig {
    /// Builds a config identical to [`Default`] but with a custom tolerance.
    pub fn with_eps(eps: f64) -> Self {
        SimConfig {
            eps,
            ..Self::default()
        }
    }
}
