//! Motion variants: the piecewise kinematics of a single object, each
//! queried in two ways (`move_until_proper_time`, `move_until_coordinate_time`)
//! per `spec.md` §4.2.
//!
//! Every variant's output is expressed in the frame momentarily co-moving
//! with the object at the *start* of that motion — callers
//! ([`crate::object`]'s `advance_to_proper_time`/`advance_to_coordinate_time`)
//! transform back into the world frame afterwards.

use crate::errors::SimError;
use crate::geometry::{Frame, State, Vector3, Vector4};
use crate::math;

/// A single segment of an object's piecewise-defined history.
///
/// All variants carry `tau_start`; `AbruptVelocityChange` is a single
/// instant (`tau_end == tau_start`); `Inertial` and
/// `LongitudinalAcceleration` span `[tau_start, tau_end]` and may have
/// `tau_end == f64::INFINITY` for an open-ended trailing segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// The object coasts at whatever velocity the previous segment left
    /// it with.
    Inertial { tau_start: f64, tau_end: f64 },
    /// An instantaneous switch of velocity to `v`, expressed in the
    /// previous co-moving frame.
    AbruptVelocityChange { tau_start: f64, v: Vector3<f64> },
    /// Constant proper acceleration `a`, in the frame momentarily
    /// co-moving with the object at `tau_start`.
    LongitudinalAcceleration {
        tau_start: f64,
        tau_end: f64,
        a: Vector3<f64>,
    },
}

impl Motion {
    pub fn tau_start(&self) -> f64 {
        match self {
            Motion::Inertial { tau_start, .. } => *tau_start,
            Motion::AbruptVelocityChange { tau_start, .. } => *tau_start,
            Motion::LongitudinalAcceleration { tau_start, .. } => *tau_start,
        }
    }

    /// For `AbruptVelocityChange` this equals `tau_start`.
    pub fn tau_end(&self) -> f64 {
        match self {
            Motion::Inertial { tau_end, .. } => *tau_end,
            Motion::AbruptVelocityChange { tau_start, .. } => *tau_start,
            Motion::LongitudinalAcceleration { tau_end, .. } => *tau_end,
        }
    }

    /// The object's State, in the co-moving frame supplied, at proper
    /// time `tau_to`. `tau_now` is the proper time this call starts
    /// advancing from (normally this motion's own `tau_start`, but
    /// reverse queries with `tau_to < tau_now` are permitted).
    ///
    /// Contract: the returned `tau` always equals `tau_to` exactly.
    pub fn move_until_proper_time(
        &self,
        co_moving: &Frame,
        tau_now: f64,
        tau_to: f64,
    ) -> Result<State, SimError> {
        // Every variant's proper-time closed form is already expressed in
        // the object's own momentarily co-moving rest frame; `co_moving`
        // is accepted (and used by `move_until_coordinate_time`) purely to
        // keep the two queries' signatures symmetric per spec.md §4.2.
        let _ = co_moving;
        match self {
            Motion::Inertial { .. } => {
                let delta_tau = tau_to - tau_now;
                Ok(State {
                    r: Vector4::new(delta_tau, 0.0, 0.0, 0.0),
                    v: Vector3::zeros(),
                    tau: tau_to,
                })
            }
            Motion::AbruptVelocityChange { tau_start, v } => Ok(State {
                r: Vector4::zeros(),
                v: *v,
                tau: *tau_start,
            }),
            Motion::LongitudinalAcceleration { .. } => {
                let a = self.acceleration_vector();
                let delta_tau = tau_to - tau_now;
                let raw = math::relativistic_acceleration(a, delta_tau);
                Ok(State {
                    r: raw.r,
                    v: raw.v,
                    tau: tau_to,
                })
            }
        }
    }

    /// The object's State, in the co-moving frame supplied, reached after
    /// `delta_t_world` world-frame coordinate time has elapsed since
    /// `tau_now`, or at this motion's `tau_end` if that is reached first.
    pub fn move_until_coordinate_time(
        &self,
        co_moving: &Frame,
        tau_now: f64,
        delta_t_world: f64,
    ) -> Result<State, SimError> {
        match self {
            Motion::Inertial { tau_end, .. } => {
                let gamma_v = math::gamma(co_moving.v.norm())?;
                let delta_tau_raw = delta_t_world / gamma_v;
                let max_delta_tau = tau_end - tau_now;
                let delta_tau = delta_tau_raw.min(max_delta_tau);
                // Same (tau, 0, 0, 0) shape as `move_until_proper_time`: the
                // local frame's own clock reads Δτ regardless of how Δτ was
                // derived. The caller recovers elapsed *world* time by
                // transforming this State back through `co_moving`.
                Ok(State {
                    r: Vector4::new(delta_tau, 0.0, 0.0, 0.0),
                    v: Vector3::zeros(),
                    tau: tau_now + delta_tau,
                })
            }
            Motion::AbruptVelocityChange { tau_start, v } => Ok(State {
                r: Vector4::zeros(),
                v: *v,
                tau: *tau_start,
            }),
            Motion::LongitudinalAcceleration { tau_end, .. } => {
                let a = self.acceleration_vector();
                let raw = math::relativistic_coord_acceleration_in_frame(a, delta_t_world, co_moving)?;
                let max_delta_tau = tau_end - tau_now;
                if raw.tau <= max_delta_tau {
                    Ok(State {
                        r: raw.r,
                        v: raw.v,
                        tau: tau_now + raw.tau,
                    })
                } else {
                    let capped = math::relativistic_acceleration(a, max_delta_tau);
                    Ok(State {
                        r: capped.r,
                        v: capped.v,
                        tau: *tau_end,
                    })
                }
            }
        }
    }

    fn acceleration_vector(&self) -> Vector3<f64> {
        match self {
            Motion::LongitudinalAcceleration { a, .. } => *a,
            _ => Vector3::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn inertial_proper_time_is_exact() {
        let m = Motion::Inertial {
            tau_start: 0.0,
            tau_end: 10.0,
        };
        let f = Frame::origin();
        let s = m.move_until_proper_time(&f, 0.0, 3.5).unwrap();
        assert_abs_diff_eq!(s.tau, 3.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.r[0], 3.5, epsilon = 1e-12);
    }

    #[test]
    fn inertial_coordinate_time_scales_by_gamma() {
        let m = Motion::Inertial {
            tau_start: 0.0,
            tau_end: 100.0,
        };
        let f = Frame {
            r: Vector4::zeros(),
            v: Vector3::new(0.5, 0.0, 0.0),
        };
        let s = m.move_until_coordinate_time(&f, 0.0, 10.0).unwrap();
        let gamma = 2.0 / 3f64.sqrt();
        assert_abs_diff_eq!(s.tau, 10.0 / gamma, epsilon = 1e-9);
    }

    #[test]
    fn inertial_coordinate_time_caps_at_segment_end() {
        let m = Motion::Inertial {
            tau_start: 0.0,
            tau_end: 1.0,
        };
        let f = Frame {
            r: Vector4::zeros(),
            v: Vector3::new(0.5, 0.0, 0.0),
        };
        // request far more coordinate time than the segment can hold
        let s = m.move_until_coordinate_time(&f, 0.0, 1000.0).unwrap();
        assert_abs_diff_eq!(s.tau, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn abrupt_change_ignores_requested_target_and_jumps() {
        let m = Motion::AbruptVelocityChange {
            tau_start: 4.0,
            v: Vector3::new(0.2, 0.1, 0.0),
        };
        let f = Frame::origin();
        let s = m.move_until_proper_time(&f, 4.0, 99.0).unwrap();
        assert_abs_diff_eq!(s.tau, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.v.x, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn acceleration_proper_and_coordinate_queries_are_mutual_inverses() {
        let m = Motion::LongitudinalAcceleration {
            tau_start: 0.0,
            tau_end: f64::INFINITY,
            a: Vector3::new(1.0, 0.0, 0.0),
        };
        let f = Frame::origin();
        let s = m.move_until_proper_time(&f, 0.0, 1.0).unwrap();
        let t = s.r[0];
        let back = m.move_until_coordinate_time(&f, 0.0, t).unwrap();
        assert_abs_diff_eq!(back.tau, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn acceleration_coordinate_query_caps_at_segment_end() {
        let m = Motion::LongitudinalAcceleration {
            tau_start: 0.0,
            tau_end: 1.0,
            a: Vector3::new(1.0, 0.0, 0.0),
        };
        let f = Frame::origin();
        let s = m.move_until_coordinate_time(&f, 0.0, 1_000_000.0).unwrap();
        assert_abs_diff_eq!(s.tau, 1.0, epsilon = 1e-9);
    }
}
