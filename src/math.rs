//! The closed-form relativistic math kernel.
//!
//! `spec.md` treats this module as an external collaborator, specified
//! only by input/output contract (its §6). Everything here is a pure
//! function over `nalgebra` vectors; none of it touches [`crate::world`]
//! or [`crate::object`].

use crate::errors::SimError;
use crate::geometry::{Frame, State, Vector3, Vector4};

/// The Lorentz/gamma factor `1 / sqrt(1 - v^2)` for a 3-velocity magnitude,
/// with `c = 1`.
pub fn gamma(v: f64) -> Result<f64, SimError> {
    if v.abs() >= 1.0 {
        return Err(SimError::LightspeedFrame { v });
    }
    Ok(1.0 / (1.0 - v * v).sqrt())
}

/// Relativistic (Einstein) addition of two 3-velocities, in a general,
/// not-necessarily-aligned configuration.
///
/// `v` is the frame's velocity (relative to the frame `u` is expressed
/// in); `u` is the velocity to transform. `sign` flips the composition
/// direction: `+1.0` composes `v` and `u` (observed-added-velocity),
/// `-1.0` composes `-v` and `u` (transformed-added-velocity, i.e. its
/// inverse).
fn compose_velocities(v: Vector3<f64>, u: Vector3<f64>, sign: f64) -> Result<Vector3<f64>, SimError> {
    let v = sign * v;
    let v_mag = v.norm();
    if v_mag == 0.0 {
        return Ok(u);
    }
    let g = gamma(v_mag)?;
    let v_dot_u = v.dot(&u);
    let denom = 1.0 + v_dot_u;
    if denom == 0.0 {
        return Err(SimError::LightspeedFrame { v: v_mag });
    }
    let result = (u / g + v + (g / (g + 1.0)) * v_dot_u * v) / denom;
    Ok(result)
}

/// Given a frame moving with velocity `v_frame` (relative to some outer
/// frame), and an object's velocity `u_prime` expressed *within*
/// `v_frame`, returns the object's velocity in the outer frame.
pub fn observed_added_velocity(v_frame: Vector3<f64>, u_prime: Vector3<f64>) -> Result<Vector3<f64>, SimError> {
    compose_velocities(v_frame, u_prime, 1.0)
}

/// The inverse of [`observed_added_velocity`]: given an object's velocity
/// `u` in the outer frame and the velocity `v_frame` of a frame relative
/// to that outer frame, returns the object's velocity as seen *within*
/// `v_frame`.
pub fn transformed_added_velocity(v_frame: Vector3<f64>, u: Vector3<f64>) -> Result<Vector3<f64>, SimError> {
    compose_velocities(v_frame, u, -1.0)
}

/// Decomposes `r` into components parallel and perpendicular to `v`.
/// Returns `(parallel, perpendicular)`; if `v` is zero, all of `r` is
/// returned as the perpendicular component.
fn split_along(r: Vector3<f64>, v: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let v_mag = v.norm();
    if v_mag == 0.0 {
        return (Vector3::zeros(), r);
    }
    let v_hat = v / v_mag;
    let parallel = v_hat * r.dot(&v_hat);
    (parallel, r - parallel)
}

/// The standard 4-vector Lorentz boost of `r4` into a frame moving with
/// velocity `v` relative to the frame `r4` is expressed in.
pub fn lorentz_transform(v: Vector3<f64>, r4: Vector4<f64>) -> Result<Vector4<f64>, SimError> {
    let v_mag = v.norm();
    if v_mag == 0.0 {
        return Ok(r4);
    }
    let g = gamma(v_mag)?;
    let t = r4[0];
    let r = r4.fixed_rows::<3>(1).into_owned();
    let (r_par, r_perp) = split_along(r, v);
    let t_prime = g * (t - v.dot(&r));
    let r_par_prime = g * (r_par - v * t);
    let r_prime = r_par_prime + r_perp;
    Ok(Vector4::new(t_prime, r_prime.x, r_prime.y, r_prime.z))
}

/// The inverse boost of [`lorentz_transform`]: boosts `r4` by `-v`.
pub fn lorentz_transform_inv(v: Vector3<f64>, r4: Vector4<f64>) -> Result<Vector4<f64>, SimError> {
    lorentz_transform(-v, r4)
}

/// Closed-form hyperbolic motion under constant proper acceleration `a0`,
/// expressed in the frame momentarily co-moving with the object at the
/// start of the acceleration, after proper time `tau` has elapsed.
///
/// A zero acceleration vector is treated as the (degenerate) inertial
/// case: the object simply coasts for `tau`.
pub fn relativistic_acceleration(a0: Vector3<f64>, tau: f64) -> State {
    let alpha = a0.norm();
    if alpha == 0.0 {
        return State {
            r: Vector4::new(tau, 0.0, 0.0, 0.0),
            v: Vector3::zeros(),
            tau,
        };
    }
    let n_hat = a0 / alpha;
    let position = n_hat * ((alpha * tau).cosh() - 1.0) / alpha;
    let time = (alpha * tau).sinh() / alpha;
    let velocity = n_hat * (alpha * tau).tanh();
    State {
        r: Vector4::new(time, position.x, position.y, position.z),
        v: velocity,
        tau,
    }
}

/// The coordinate-time inverse of [`relativistic_acceleration`] in the
/// frame momentarily co-moving with the object at the start of the
/// acceleration: given elapsed coordinate time `t` in that same frame,
/// returns the corresponding State.
pub fn relativistic_coord_acceleration(a0: Vector3<f64>, t: f64) -> State {
    let alpha = a0.norm();
    if alpha == 0.0 {
        return State {
            r: Vector4::new(t, 0.0, 0.0, 0.0),
            v: Vector3::zeros(),
            tau: t,
        };
    }
    let tau = (alpha * t).asinh() / alpha;
    relativistic_acceleration(a0, tau)
}

/// The general case of [`relativistic_coord_acceleration`] for a motion
/// that starts in a frame boosted by `frame.v` relative to the frame in
/// which `t` is measured. Solves the transcendental equation of
/// `spec.md` §6 for the proper time `tau` elapsed, then evaluates the
/// closed-form hyperbolic motion at that proper time.
///
/// Reduces to [`relativistic_coord_acceleration`] when `frame.v` is zero,
/// and to a pure [`lorentz_transform_inv`] when `a0` is zero.
pub fn relativistic_coord_acceleration_in_frame(
    a0: Vector3<f64>,
    t: f64,
    frame: &Frame,
) -> Result<State, SimError> {
    let alpha = a0.norm();
    if alpha == 0.0 {
        let r4 = lorentz_transform_inv(frame.v, Vector4::new(t, 0.0, 0.0, 0.0))?;
        return Ok(State {
            r: r4,
            v: Vector3::zeros(),
            tau: r4[0],
        });
    }

    let v_mag = frame.v.norm();
    if v_mag == 0.0 {
        return Ok(relativistic_coord_acceleration(a0, t));
    }

    let n_hat = a0 / alpha;
    let w = frame.v.dot(&n_hat);
    let g = gamma(v_mag)?;
    let at_over_g = alpha * t / g;
    let radicand = at_over_g * at_over_g + 2.0 * at_over_g * w + 1.0;
    if radicand < 0.0 {
        return Err(SimError::LightspeedFrame { v: v_mag });
    }
    let numerator = -w * radicand.sqrt() + w + at_over_g;
    let denom = 1.0 - w * w;
    if denom == 0.0 {
        return Err(SimError::LightspeedFrame { v: v_mag });
    }
    let tau = (numerator / denom).asinh() / alpha;
    Ok(relativistic_acceleration(a0, tau))
}

/// The causal relationship between two events, classified relative to a
/// tolerance `eps` on the squared interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separation {
    Timelike,
    Lightlike,
    Spacelike,
}

/// Classifies the spacetime interval between `r1` and `r2`: the sign of
/// `dt^2 - |dr|^2` relative to `eps^2`.
pub fn separation(r1: Vector4<f64>, r2: Vector4<f64>, eps: f64) -> Separation {
    let dt = r2[0] - r1[0];
    let dr = r2.fixed_rows::<3>(1).into_owned() - r1.fixed_rows::<3>(1).into_owned();
    let interval = dt * dt - dr.norm_squared();
    let threshold = eps * eps;
    if interval.abs() <= threshold {
        Separation::Lightlike
    } else if interval > 0.0 {
        Separation::Timelike
    } else {
        Separation::Spacelike
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gamma_of_half_lightspeed_matches_closed_form() {
        let g = gamma(0.5).unwrap();
        assert_abs_diff_eq!(g, 2.0 / 3f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn gamma_rejects_lightspeed_and_above() {
        assert!(gamma(1.0).is_err());
        assert!(gamma(1.5).is_err());
    }

    #[test]
    fn velocity_addition_never_exceeds_c() {
        let v = Vector3::new(0.9, 0.0, 0.0);
        let u = Vector3::new(0.9, 0.0, 0.0);
        let w = observed_added_velocity(v, u).unwrap();
        assert!(w.norm() < 1.0);
        assert_abs_diff_eq!(w.x, (0.9 + 0.9) / (1.0 + 0.9 * 0.9), epsilon = 1e-9);
    }

    #[test]
    fn transformed_is_inverse_of_observed() {
        let v = Vector3::new(0.3, -0.1, 0.2);
        let u_prime = Vector3::new(0.1, 0.05, -0.2);
        let u = observed_added_velocity(v, u_prime).unwrap();
        let back = transformed_added_velocity(v, u).unwrap();
        assert_abs_diff_eq!(back.x, u_prime.x, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, u_prime.y, epsilon = 1e-9);
        assert_abs_diff_eq!(back.z, u_prime.z, epsilon = 1e-9);
    }

    #[test]
    fn lorentz_roundtrip_via_inverse() {
        let v = Vector3::new(0.6, 0.0, 0.0);
        let r4 = Vector4::new(10.0, 3.0, 1.0, -2.0);
        let boosted = lorentz_transform(v, r4).unwrap();
        let back = lorentz_transform_inv(v, boosted).unwrap();
        assert_abs_diff_eq!(back[0], r4[0], epsilon = 1e-9);
        assert_abs_diff_eq!(back[1], r4[1], epsilon = 1e-9);
    }

    #[test]
    fn hyperbolic_rocket_after_unit_proper_time() {
        let a0 = Vector3::new(1.0, 0.0, 0.0);
        let s = relativistic_acceleration(a0, 1.0);
        assert_abs_diff_eq!(s.r[0], 1f64.sinh(), epsilon = 1e-9);
        assert_abs_diff_eq!(s.r[1], 1f64.cosh() - 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.v.x, 1f64.tanh(), epsilon = 1e-9);
    }

    #[test]
    fn coord_and_proper_acceleration_are_mutual_inverses() {
        let a0 = Vector3::new(0.5, 0.0, 0.0);
        let tau = 2.0;
        let s = relativistic_acceleration(a0, tau);
        let t = s.r[0];
        let back = relativistic_coord_acceleration(a0, t);
        assert_abs_diff_eq!(back.tau, tau, epsilon = 1e-9);
    }

    #[test]
    fn boosted_coord_acceleration_reduces_to_unboosted_when_v_zero() {
        let a0 = Vector3::new(0.3, 0.0, 0.0);
        let frame = Frame::origin();
        let a = relativistic_coord_acceleration_in_frame(a0, 4.0, &frame).unwrap();
        let b = relativistic_coord_acceleration(a0, 4.0);
        assert_abs_diff_eq!(a.tau, b.tau, epsilon = 1e-9);
    }

    #[test]
    fn zero_acceleration_boosted_is_pure_inverse_boost() {
        let frame = Frame {
            r: Vector4::zeros(),
            v: Vector3::new(0.4, 0.0, 0.0),
        };
        let s = relativistic_coord_acceleration_in_frame(Vector3::zeros(), 5.0, &frame).unwrap();
        let expected = lorentz_transform_inv(frame.v, Vector4::new(5.0, 0.0, 0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(s.r[0], expected[0], epsilon = 1e-9);
    }

    #[test]
    fn separation_classifies_lightlike_events() {
        let r1 = Vector4::new(0.0, 0.0, 0.0, 0.0);
        let r2 = Vector4::new(1.0, 1.0, 0.0, 0.0);
        assert_eq!(separation(r1, r2, 1e-8), Separation::Lightlike);
        let r3 = Vector4::new(2.0, 1.0, 0.0, 0.0);
        assert_eq!(separation(r1, r3, 1e-8), Separation::Timelike);
        let r4 = Vector4::new(1.0, 2.0, 0.0, 0.0);
        assert_eq!(separation(r1, r4, 1e-8), Separation::Spacelike);
    }
}
