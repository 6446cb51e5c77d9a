//! Object identity, the motions/actions collections of `spec.md` §3, and
//! the proper-time/coordinate-time advancement helpers of §4.4.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::action::Action;
use crate::errors::SimError;
use crate::geometry::{Frame, State};
use crate::motion::Motion;

/// A stable handle identifying an object across the lifetime of a
/// simulation. Wraps the object's name (objects are identified by name
/// per `spec.md` §3) behind a cheaply-clonable `Arc<str>` so that `World`
/// can key its `Obj -> State` map without re-allocating strings, and
/// without `Obj` holding a back-reference into `World` (see
/// `SPEC_FULL.md` §9, "cyclic references").
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjId(pub Arc<str>);

impl ObjId {
    pub fn new(name: &str) -> Self {
        ObjId(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(0);

/// A stable, process-wide-unique handle for a single [`Action`] instance,
/// assigned at construction time. Actions are not generally unique by
/// name (a `Sender` reschedules itself under the same cause name every
/// period), so identity is tracked separately from the `Cause`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ActionId(u64);

impl ActionId {
    pub(crate) fn fresh() -> Self {
        ActionId(NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Total order over proper-time values used as a `BTreeMap` key. Proper
/// times arising from this crate's arithmetic are never NaN; a NaN here
/// indicates a programming error upstream, not a representable instant.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedTau(f64);

impl Eq for OrderedTau {}

impl Ord for OrderedTau {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for OrderedTau {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An object's identity plus its append-only motions and actions
/// timelines. `Obj` deliberately does not know about `World`: the world
/// owns the `Obj -> State` mapping and all action-state tokens (see
/// `SPEC_FULL.md` §9).
#[derive(Debug, Clone)]
pub struct Obj {
    pub id: ObjId,
    motions: BTreeMap<u64, Motion>,
    actions: Vec<Action>,
}

/// Bit-pattern ordering key so motions can live in a `BTreeMap` keyed on
/// proper-time start without requiring `f64: Ord`. Same transform as
/// `f64::total_cmp`, with the sign bit flipped afterwards so the result
/// orders correctly as a plain unsigned `BTreeMap` key (including for
/// negative proper times, which `add_object`'s `tau` parameter permits).
fn tau_key(tau: f64) -> u64 {
    let bits = OrderedTau(tau).0.to_bits();
    let mask = (((bits as i64) >> 63) as u64) >> 1;
    (bits ^ mask) ^ 0x8000_0000_0000_0000
}


impl Obj {
    pub fn new(name: &str) -> Self {
        Obj {
            id: ObjId::new(name),
            motions: BTreeMap::new(),
            actions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    /// Appends a motion. Fails with [`SimError::InvalidMotion`] if it
    /// overlaps the half-open proper-time interval of a neighboring
    /// motion, per `spec.md` §4.3.
    pub fn add_motion(&mut self, m: Motion) -> Result<(), SimError> {
        let start = m.tau_start();
        let end = m.tau_end();
        let invalid = || SimError::InvalidMotion {
            tau_start: start,
            tau_end: end,
        };

        if let Some((_, prev)) = self.motions.range(..tau_key(start)).next_back() {
            if prev.tau_end() > start {
                return Err(invalid());
            }
        }
        if let Some((_, next)) = self.motions.range(tau_key(start)..).next() {
            if next.tau_start() <= start || next.tau_start() < end {
                return Err(invalid());
            }
        }

        self.motions.insert(tau_key(start), m);
        Ok(())
    }

    /// Appends an action, keeping the collection sorted by
    /// `(tau_start, tau_end, name)` per `spec.md` §3. Fails with
    /// [`SimError::InvalidAction`] if `tau_end < tau_start`.
    pub fn add_action(&mut self, a: Action) -> Result<(), SimError> {
        if a.tau_end < a.tau_start {
            return Err(SimError::InvalidAction {
                tau_start: a.tau_start,
                tau_end: a.tau_end,
            });
        }
        let idx = self.actions.partition_point(|existing| action_order_less(existing, &a));
        self.actions.insert(idx, a);
        Ok(())
    }

    /// All actions, in the stable `spec.md` §3 order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The first action matching `predicate`, in stable order — used by
    /// the scheduler to find each object's next pending action.
    pub fn first_action_matching(&self, mut predicate: impl FnMut(&Action) -> bool) -> Option<&Action> {
        self.actions.iter().find(|a| predicate(a))
    }

    /// All motions whose `[tau_start, tau_end]` intersects
    /// `[from, to]` (inclusive), in proper-time order, per `spec.md` §4.4
    /// step 1 ("motions whose proper-time range intersects...").
    pub fn motions_in_range(&self, from: f64, to: f64) -> impl Iterator<Item = &Motion> {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        self.motions
            .values()
            .filter(move |m| m.tau_start() <= hi && m.tau_end() >= lo)
    }

    pub fn last_motion_tau_end(&self) -> Option<f64> {
        self.motions.values().last().map(|m| m.tau_end())
    }
}

fn action_order_less(a: &Action, b: &Action) -> bool {
    if a.tau_start != b.tau_start {
        return a.tau_start < b.tau_start;
    }
    if a.tau_end != b.tau_end {
        return a.tau_end < b.tau_end;
    }
    a.cause.name < b.cause.name
}

/// Advances `state` (the object's current State, in the world frame) to
/// proper time `tau_target`, per `spec.md` §4.4.
///
/// Enumerates `obj`'s motions overlapping `[state.tau, tau_target]`,
/// applying each in turn (computed in the frame momentarily co-moving
/// with the object, then transformed back into the world frame). Gaps
/// not covered by any motion are synthesized as inertial coasting at the
/// object's current velocity.
pub fn advance_to_proper_time(obj: &Obj, state: &State, tau_target: f64, eps: f64) -> Result<State, SimError> {
    let mut current = *state;
    let motions: Vec<Motion> = obj.motions_in_range(state.tau, tau_target).copied().collect();

    let mut cursor_tau = state.tau;
    for m in &motions {
        if m.tau_start() > cursor_tau {
            let gap = Motion::Inertial {
                tau_start: cursor_tau,
                tau_end: m.tau_start(),
            };
            current = apply_proper_time_segment(&current, &gap, m.tau_start())?;
            cursor_tau = m.tau_start();
        }
        let segment_target = tau_target.min(m.tau_end());
        current = apply_proper_time_segment(&current, m, segment_target)?;
        cursor_tau = current.tau;
        if cursor_tau >= tau_target {
            break;
        }
    }

    if cursor_tau < tau_target {
        let tail = Motion::Inertial {
            tau_start: cursor_tau,
            tau_end: f64::INFINITY,
        };
        current = apply_proper_time_segment(&current, &tail, tau_target)?;
    }

    if (current.tau - tau_target).abs() <= eps {
        current.tau = tau_target;
    }
    Ok(current)
}

fn apply_proper_time_segment(state: &State, m: &Motion, tau_to: f64) -> Result<State, SimError> {
    let co_moving = Frame { r: state.r, v: state.v };
    let local = m.move_until_proper_time(&co_moving, state.tau, tau_to)?;
    local.transform(&co_moving, &Frame::origin())
}

/// Advances `state` (the object's current State, in the world frame) to
/// world-frame coordinate time `t_target`, per `spec.md` §4.4.
///
/// The coordinate-time analogue of [`advance_to_proper_time`]: iterates
/// motions (synthesizing inertial gaps the same way), stopping as soon as
/// `t_target` is reached, and continuing into the next segment if a
/// motion's `tau_end` arrives first.
pub fn advance_to_coordinate_time(obj: &Obj, state: &State, t_target: f64, eps: f64) -> Result<State, SimError> {
    let mut current = *state;
    let motions: Vec<Motion> = obj.motions_in_range(current.tau, f64::INFINITY).copied().collect();
    let mut idx = 0;

    loop {
        if current.r[0] >= t_target {
            break;
        }

        // A motion starting no later than `current.tau` is live now and is
        // consumed from the list (even zero-length ones like
        // `AbruptVelocityChange`, which still update velocity); one that
        // starts later leaves a gap filled by synthetic inertial coasting.
        let m = match motions.get(idx) {
            Some(m) if m.tau_start() <= current.tau => {
                idx += 1;
                *m
            }
            Some(m) => Motion::Inertial {
                tau_start: current.tau,
                tau_end: m.tau_start(),
            },
            None => Motion::Inertial {
                tau_start: current.tau,
                tau_end: f64::INFINITY,
            },
        };

        let co_moving = Frame { r: current.r, v: current.v };
        let delta_t_world = t_target - current.r[0];
        let local = m.move_until_coordinate_time(&co_moving, current.tau, delta_t_world)?;
        let advanced = local.transform(&co_moving, &Frame::origin())?;

        if advanced == current {
            // No motion left that can make any progress at all.
            break;
        }
        current = advanced;
    }

    if (current.r[0] - t_target).abs() <= eps {
        current.r[0] = t_target;
    }
    Ok(current)
}
