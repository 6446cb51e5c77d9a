//! Action variants of `spec.md` §3–§4.6: scheduled pieces of behavior an
//! object carries on its timeline. The scheduler (`crate::scheduler`)
//! invokes [`Action::act`] once per firing, passing a mutable
//! [`WorldView`] and the action's own opaque [`ActionState`] token.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::delta_world::WorldView;
use crate::event::Event;
use crate::geometry::{Frame, State};
use crate::math::{self, Separation};
use crate::object::{ActionId, ObjId};

/// Metadata every action carries: a name (not necessarily unique — a
/// `Sender` reschedules itself under the same name every period) and
/// whether firing it should be logged as an `Action`/`Action-end` event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cause {
    pub name: String,
    pub silent: bool,
}

impl Cause {
    pub fn new(name: impl Into<String>) -> Self {
        Cause {
            name: name.into(),
            silent: false,
        }
    }

    pub fn silent(name: impl Into<String>) -> Self {
        Cause {
            name: name.into(),
            silent: true,
        }
    }
}

/// A request, raised from inside [`Action::act`], that the scheduler
/// bisect its current evaluation window and re-invoke the callback at a
/// smaller step. Never surfaced past `crate::scheduler`'s inner loop —
/// `spec.md` §7 is explicit that it is "never surfaced" as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RetrySmallerStep {
    pub hint: Option<f64>,
}

/// The result of one [`Action::act`] invocation: either the action's new
/// opaque state, or a request to bisect and retry.
pub type ActionOutcome = Result<ActionState, RetrySmallerStep>;

/// Per-action opaque state, carried by the world between firings. Each
/// built-in [`ActionKind`] owns exactly one variant here; the variant is
/// matched directly, never downcast from a type-erased token.
#[derive(Clone)]
pub enum ActionState {
    /// The state before an action has fired for the first time, and the
    /// steady state of actions (`Marker`, `Sender`) that carry none.
    Init,
    Pulse {
        impossible: HashSet<ObjId>,
        tracked: HashSet<ObjId>,
        source_pos: Option<State>,
    },
    DetectCollision {
        generated: HashSet<ObjId>,
    },
    /// Escape hatch for `UserCallback` actions that need their own
    /// opaque state shape.
    Custom(Arc<dyn std::any::Any + Send + Sync>),
}

impl fmt::Debug for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionState::Init => write!(f, "Init"),
            ActionState::Pulse { impossible, tracked, source_pos } => f
                .debug_struct("Pulse")
                .field("impossible", impossible)
                .field("tracked", tracked)
                .field("source_pos", source_pos)
                .finish(),
            ActionState::DetectCollision { generated } => {
                f.debug_struct("DetectCollision").field("generated", generated).finish()
            }
            ActionState::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Signature a `UserCallback` action must implement: given the current
/// world view, its owning object, the firing coordinate time, and its
/// own previous state, produce a new state or ask to retry smaller.
pub type UserCallbackFn = dyn Fn(&mut dyn WorldView, &ObjId, f64, &ActionState) -> ActionOutcome + Send + Sync;

/// The closed tagged-variant set of `spec.md` §3's "Action polymorphism"
/// design note: an enum rather than a trait-object hierarchy, with
/// `UserCallback` as the escape hatch for client-defined behavior.
#[derive(Clone)]
pub enum ActionKind {
    /// No behavior of its own; fires the generic `Action` event.
    Marker,
    /// On firing, schedules one `Pulse` at `start` and a follow-up
    /// `Sender` at `start + period`.
    Sender { start: f64, period: f64, n: u64 },
    /// A spherical lightlike signal originating at the owning object's
    /// position at this action's `tau_start`. See `spec.md` §4.5.
    Pulse,
    /// Proximity detection against a fixed target list. See `spec.md`
    /// §4.6.
    DetectCollision { targets: Vec<ObjId> },
    /// Client-supplied behavior.
    UserCallback(Arc<UserCallbackFn>),
    /// A scheduler-internal bookkeeping action appended at a fired
    /// action's `tau_end` (`spec.md` §4.7 step 5): completes `target` and,
    /// if `emit_end` is set, logs an `Action-end` event for it. Never
    /// constructed by client code.
    Finisher {
        target: ActionId,
        emit_end: bool,
    },
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Marker => write!(f, "Marker"),
            ActionKind::Sender { start, period, n } => {
                f.debug_struct("Sender").field("start", start).field("period", period).field("n", n).finish()
            }
            ActionKind::Pulse => write!(f, "Pulse"),
            ActionKind::DetectCollision { targets } => {
                f.debug_struct("DetectCollision").field("targets", targets).finish()
            }
            ActionKind::UserCallback(_) => write!(f, "UserCallback(..)"),
            ActionKind::Finisher { target, emit_end } => {
                f.debug_struct("Finisher").field("target", target).field("emit_end", emit_end).finish()
            }
        }
    }
}

/// A scheduled action on an object's timeline: a `Cause`, a half-open
/// (possibly single-point) proper-time interval `[tau_start, tau_end]`,
/// and the behavior it runs when fired.
#[derive(Debug, Clone)]
pub struct Action {
    pub id: ActionId,
    pub cause: Cause,
    pub tau_start: f64,
    pub tau_end: f64,
    pub kind: ActionKind,
}

impl Action {
    /// A single-point action with no behavior of its own.
    pub fn marker(name: &str, tau: f64) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: Cause::new(name),
            tau_start: tau,
            tau_end: tau,
            kind: ActionKind::Marker,
        }
    }

    /// Fires once at `start`, then reschedules itself every `period`
    /// proper-time units, each firing emitting one `Pulse`.
    pub fn sender(name: &str, start: f64, period: f64) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: Cause::new(name),
            tau_start: start,
            tau_end: start,
            kind: ActionKind::Sender { start, period, n: 0 },
        }
    }

    /// A single-point, silent action with no behavior of its own — used
    /// by `DeltaWorld::add_or_set_object` to mark an object's
    /// reintroduction without an audible `Action` event.
    pub fn marker_silent(name: &str, tau: f64) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: Cause::silent(name),
            tau_start: tau,
            tau_end: tau,
            kind: ActionKind::Marker,
        }
    }

    fn sender_next(&self, start: f64, period: f64, n: u64) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: self.cause.clone(),
            tau_start: start,
            tau_end: start,
            kind: ActionKind::Sender { start, period, n },
        }
    }

    /// A lightlike pulse emitted from the owning object's position at
    /// `tau_start`. Stays active forever (`tau_end == infinity`) per
    /// `spec.md` §4.5.
    pub fn pulse(name: &str, tau_start: f64) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: Cause::new(name),
            tau_start,
            tau_end: f64::INFINITY,
            kind: ActionKind::Pulse,
        }
    }

    fn pulse_from(&self, tau_start: f64) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: self.cause.clone(),
            tau_start,
            tau_end: f64::INFINITY,
            kind: ActionKind::Pulse,
        }
    }

    /// Active over `[tau, until]`, watching `targets` for proximity to
    /// the owning object. See `spec.md` §4.6.
    pub fn detect_collision(name: &str, tau: f64, until: f64, targets: Vec<ObjId>) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: Cause::new(name),
            tau_start: tau,
            tau_end: until,
            kind: ActionKind::DetectCollision { targets },
        }
    }

    /// The scheduler-internal finisher appended after `original` is
    /// promoted to `activeActions`: fires once at `original.tau_end`,
    /// completing it and (unless `original` is silent) logging an
    /// `Action-end` event. See `spec.md` §4.7 step 5.
    pub(crate) fn finisher(original: &Action) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: Cause::silent(format!("{}-finish", original.cause.name)),
            tau_start: original.tau_end,
            tau_end: original.tau_end,
            kind: ActionKind::Finisher {
                target: original.id,
                emit_end: !original.cause.silent,
            },
        }
    }

    /// Client-supplied behavior over `[tau_start, tau_end]`.
    pub fn user_callback(
        name: &str,
        tau_start: f64,
        tau_end: f64,
        f: impl Fn(&mut dyn WorldView, &ObjId, f64, &ActionState) -> ActionOutcome + Send + Sync + 'static,
    ) -> Action {
        Action {
            id: ActionId::fresh(),
            cause: Cause::new(name),
            tau_start,
            tau_end,
            kind: ActionKind::UserCallback(Arc::new(f)),
        }
    }

    /// Runs this action's behavior for one firing at coordinate time
    /// `tau`, against `state` (the action's previous opaque state).
    /// `eps` is the proximity/lightcone tolerance from `SimConfig`.
    pub fn act(&self, view: &mut dyn WorldView, obj: &ObjId, tau: f64, state: &ActionState, eps: f64) -> ActionOutcome {
        match &self.kind {
            ActionKind::Marker => Ok(ActionState::Init),

            ActionKind::Sender { start, period, n } => {
                view.add_action(obj, self.pulse_from(*start));
                view.add_action(obj, self.sender_next(start + period, *period, n + 1));
                Ok(ActionState::Init)
            }

            ActionKind::Pulse => self.act_pulse(view, obj, state, eps),

            ActionKind::DetectCollision { targets } => self.act_detect_collision(view, obj, targets, state, eps),

            ActionKind::UserCallback(f) => f(view, obj, tau, state),

            ActionKind::Finisher { target, emit_end } => {
                view.complete(*target);
                if *emit_end {
                    let s = view
                        .state_in_frame(obj, &Frame::origin())
                        .expect("the owner of a finisher action always has a world-frame state");
                    view.add_event(Event::new("Action-end", *target, obj.clone(), s, obj.clone(), s));
                }
                Ok(ActionState::Init)
            }
        }
    }

    fn act_pulse(&self, view: &mut dyn WorldView, obj: &ObjId, state: &ActionState, eps: f64) -> ActionOutcome {
        let (mut impossible, mut tracked, mut source_pos) = match state {
            ActionState::Pulse { impossible, tracked, source_pos } => {
                (impossible.clone(), tracked.clone(), *source_pos)
            }
            _ => (HashSet::new(), HashSet::new(), None),
        };

        let source = match source_pos {
            Some(s) => s,
            None => {
                let s = view
                    .state_in_frame(obj, &Frame::origin())
                    .expect("owning object of a Pulse action always has a world-frame state");
                source_pos = Some(s);
                s
            }
        };

        for other in view.objects() {
            if &other == obj || impossible.contains(&other) || tracked.contains(&other) {
                continue;
            }
            let s = view
                .state_in_frame(&other, &Frame::origin())
                .expect("every live object has a world-frame state");
            match math::separation(source.r, s.r, eps) {
                Separation::Timelike => {
                    impossible.insert(other);
                }
                Separation::Lightlike => {
                    view.add_event(Event::new(&self.cause.name, self.id, obj.clone(), source, other.clone(), s));
                    impossible.insert(other);
                }
                Separation::Spacelike => {
                    tracked.insert(other);
                }
            }
        }

        let mut overshot = false;
        let mut newly_impossible = Vec::new();
        for other in &tracked {
            let s = view
                .state_in_frame(other, &Frame::origin())
                .expect("every live object has a world-frame state");
            match math::separation(source.r, s.r, eps) {
                Separation::Timelike => overshot = true,
                Separation::Lightlike => {
                    view.add_event(Event::new(&self.cause.name, self.id, obj.clone(), source, other.clone(), s));
                    newly_impossible.push(other.clone());
                }
                Separation::Spacelike => {}
            }
        }
        if overshot {
            return Err(RetrySmallerStep { hint: None });
        }
        for o in newly_impossible {
            tracked.remove(&o);
            impossible.insert(o);
        }

        Ok(ActionState::Pulse { impossible, tracked, source_pos })
    }

    fn act_detect_collision(
        &self,
        view: &mut dyn WorldView,
        obj: &ObjId,
        targets: &[ObjId],
        state: &ActionState,
        eps: f64,
    ) -> ActionOutcome {
        let mut generated = match state {
            ActionState::DetectCollision { generated } => generated.clone(),
            _ => HashSet::new(),
        };

        let self_state = view
            .state_in_frame(obj, &Frame::origin())
            .expect("owning object of a DetectCollision action always has a world-frame state");

        for target in targets {
            let target_state = view
                .state_in_frame(target, &Frame::origin())
                .expect("a DetectCollision target always has a world-frame state");
            let dr = target_state.r - self_state.r;
            let dist = (dr[1] * dr[1] + dr[2] * dr[2] + dr[3] * dr[3]).sqrt();

            if generated.contains(target) && dist > 2.0 * eps {
                generated.remove(target);
            } else if !generated.contains(target) && dist < 2.0 * eps {
                view.add_event(Event::new(
                    "collide",
                    self.id,
                    obj.clone(),
                    self_state,
                    target.clone(),
                    target_state,
                ));
                generated.insert(target.clone());
            }
        }

        Ok(ActionState::DetectCollision { generated })
    }
}
