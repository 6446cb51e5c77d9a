//! Frame and State value types, and the frame-to-frame transform of
//! `spec.md` §4.1.
//!
//! `Vector3`/`Vector4` are thin aliases over `nalgebra`'s fixed-size
//! vectors — the teacher crate depends on `nalgebra` throughout its
//! `dynamics` modules for exactly this kind of small linear algebra, so
//! we reuse it rather than hand-rolling tuple arithmetic.

use crate::errors::SimError;
use crate::math;

/// A pure spatial 3-vector.
pub type Vector3<T> = nalgebra::Vector3<T>;

/// A 4-vector whose index 0 is the time component and indices 1..=3 are
/// the spatial components.
pub type Vector4<T> = nalgebra::Vector4<T>;

/// The origin 4-position and velocity of a coordinate system, relative to
/// the distinguished world-origin frame (`r = 0, v = 0`).
///
/// Invariant: `|v| < 1` (`c = 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub r: Vector4<f64>,
    pub v: Vector3<f64>,
}

impl Frame {
    /// The distinguished world-origin frame.
    pub fn origin() -> Self {
        Frame {
            r: Vector4::zeros(),
            v: Vector3::zeros(),
        }
    }

    /// Whether this frame *is* the world-origin frame (zero position,
    /// zero velocity) — the base case of the frame-to-frame transform.
    pub fn is_origin(&self) -> bool {
        *self == Frame::origin()
    }
}

/// An object's spacetime position, velocity and proper time, expressed in
/// some [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub r: Vector4<f64>,
    pub v: Vector3<f64>,
    pub tau: f64,
}

impl State {
    /// Transforms `self`, expressed in frame `from`, into the equivalent
    /// State expressed in frame `to`.
    ///
    /// Routes through the world-origin frame in both directions (boosts
    /// between two arbitrary frames are never composed directly). Proper
    /// time is invariant under any frame transform. If `from == to`, the
    /// state is returned unchanged.
    pub fn transform(&self, from: &Frame, to: &Frame) -> Result<State, SimError> {
        if from == to {
            return Ok(*self);
        }

        let (r_origin, v_origin) = if from.is_origin() {
            (self.r, self.v)
        } else {
            let boosted = math::lorentz_transform_inv(from.v, self.r)?;
            let r = boosted + from.r;
            let v = math::observed_added_velocity(from.v, self.v)?;
            (r, v)
        };

        let (r_final, v_final) = if to.is_origin() {
            (r_origin, v_origin)
        } else {
            let translated = r_origin - to.r;
            let r = math::lorentz_transform(to.v, translated)?;
            let v = math::transformed_added_velocity(to.v, v_origin)?;
            (r, v)
        };

        Ok(State {
            r: r_final,
            v: v_final,
            tau: self.tau,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_state_close(a: &State, b: &State, eps: f64) {
        assert_abs_diff_eq!(a.r[0], b.r[0], epsilon = eps);
        assert_abs_diff_eq!(a.r[1], b.r[1], epsilon = eps);
        assert_abs_diff_eq!(a.r[2], b.r[2], epsilon = eps);
        assert_abs_diff_eq!(a.r[3], b.r[3], epsilon = eps);
        assert_abs_diff_eq!(a.v[0], b.v[0], epsilon = eps);
        assert_abs_diff_eq!(a.v[1], b.v[1], epsilon = eps);
        assert_abs_diff_eq!(a.v[2], b.v[2], epsilon = eps);
        assert_abs_diff_eq!(a.tau, b.tau, epsilon = eps);
    }

    fn sample_state() -> State {
        State {
            r: Vector4::new(10.0, 3.0, -1.0, 2.0),
            v: Vector3::new(0.2, -0.1, 0.05),
            tau: 7.5,
        }
    }

    fn moving_frame() -> Frame {
        Frame {
            r: Vector4::new(1.0, 0.5, 0.0, 0.0),
            v: Vector3::new(0.3, 0.0, 0.0),
        }
    }

    #[test]
    fn identity_transform_is_a_no_op() {
        let f = moving_frame();
        let s = sample_state();
        let out = s.transform(&f, &f).unwrap();
        assert_state_close(&s, &out, 1e-9);
    }

    #[test]
    fn roundtrip_through_a_frame_and_back_preserves_state() {
        let origin = Frame::origin();
        let f = moving_frame();
        let s = sample_state();
        let there = s.transform(&origin, &f).unwrap();
        let back = there.transform(&f, &origin).unwrap();
        assert_state_close(&s, &back, 1e-8);
    }

    #[test]
    fn three_way_composition_preserves_state() {
        let a = Frame::origin();
        let b = moving_frame();
        let c = Frame {
            r: Vector4::new(-2.0, 1.0, 1.0, 0.0),
            v: Vector3::new(0.0, 0.4, 0.0),
        };
        let s = sample_state();
        let s_b = s.transform(&a, &b).unwrap();
        let s_c = s_b.transform(&b, &c).unwrap();
        let s_a = s_c.transform(&c, &a).unwrap();
        assert_state_close(&s, &s_a, 1e-7);
    }

    #[test]
    fn proper_time_is_invariant_under_transform() {
        let origin = Frame::origin();
        let f = moving_frame();
        let s = sample_state();
        let there = s.transform(&origin, &f).unwrap();
        assert_abs_diff_eq!(there.tau, s.tau, epsilon = 1e-12);
    }
}
