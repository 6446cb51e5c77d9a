//! Error kinds surfaced to callers of this crate.
//!
//! `RetrySmallerStep` and the precision warning are deliberately **not**
//! members of this enum: `spec.md` §7 states the former is "never
//! surfaced" (the scheduler's inner loop consumes it as bisection
//! control flow, see [`crate::scheduler`]) and the latter is "logged" via
//! the `log` facade, not propagated as an error.

use thiserror::Error;

/// Errors raised while building or advancing a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// An added motion's proper-time interval overlaps one already present
    /// on the object, or leaves a gap before the next motion's start.
    #[error("motion [{tau_start}, {tau_end}) is invalid on this object's timeline")]
    InvalidMotion { tau_start: f64, tau_end: f64 },

    /// An added action had `tau_end < tau_start`.
    #[error("action tauEnd ({tau_end}) is before tauStart ({tau_start})")]
    InvalidAction { tau_start: f64, tau_end: f64 },

    /// A callback tried to introduce or reposition an object strictly
    /// before the world's current coordinate time.
    #[error("object introduction at t={attempted} precedes current now={now}")]
    PastObjectIntroduction { now: f64, attempted: f64 },

    /// The math kernel was asked to operate with a velocity at or above
    /// the speed of light.
    #[error("math kernel invoked with |v|={v} >= c")]
    LightspeedFrame { v: f64 },

    /// Adaptive bisection exceeded the configured retry budget while
    /// converging on a single scheduler instant.
    #[error("bisection exceeded {limit} attempts at t={at}")]
    ExcessiveRetries { at: f64, limit: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let e = SimError::LightspeedFrame { v: 1.2 };
        assert_eq!(e.to_string(), "math kernel invoked with |v|=1.2 >= c");
    }
}
