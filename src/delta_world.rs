//! `WorldView` (read capability) and `DeltaWorld` (buffered write
//! capability) of `spec.md` §4.8.
//!
//! `DeltaWorld` takes the **stricter** choice of the two snapshot
//! strategies `spec.md` §9 leaves open: every write is appended to an
//! in-memory change buffer and is folded into a fresh `World` only by
//! `DeltaWorld::apply_all`. Nothing a callback writes is visible to a
//! later retry of the same scheduler step — each retry gets a brand new
//! `DeltaWorld` over the unmodified prior `World`.

use crate::action::{Action, ActionState};
use crate::errors::SimError;
use crate::event::Event;
use crate::geometry::{Frame, State, Vector3, Vector4};
use crate::motion::Motion;
use crate::object::{ActionId, ObjId};
use crate::world::{Space, World};

/// The capability set an action's callback sees while firing, per
/// `spec.md` §4.8.
pub trait WorldView {
    fn now(&self) -> f64;
    fn origin(&self) -> Frame {
        Frame::origin()
    }
    fn objects(&self) -> Vec<ObjId>;
    fn events(&self) -> &[Event];
    fn state_in_frame(&self, obj: &ObjId, frame: &Frame) -> Result<State, SimError>;
    fn action_state(&self, action: ActionId) -> Option<&ActionState>;
    fn active_actions(&self) -> Vec<ActionId>;
    fn complete_actions(&self) -> Vec<ActionId>;
    fn log_actions(&self) -> bool;

    fn add_event(&mut self, event: Event);
    fn add_action(&mut self, obj: &ObjId, action: Action);
    fn add_motion(&mut self, obj: &ObjId, motion: Motion);
    /// Introduces `name` as a new object, or repositions an existing
    /// one, at `state`. See `spec.md` §4.8 for the future-time rewrite
    /// and past-time rejection rules.
    fn add_or_set_object(&mut self, name: &str, state: State) -> Result<(), SimError>;
    fn set_action_state(&mut self, action: ActionId, state: ActionState);
    fn complete(&mut self, action: ActionId);
    fn deactivate(&mut self, action: ActionId);
}

/// Which object a buffered [`ObjectIntro`] writes to: a brand-new object
/// (not yet in the base `World`) or a reposition of one that already
/// exists. Both go through the same future-time rewrite, per `spec.md`
/// §4.8 — the rule carves out no exception for existing objects.
enum IntroTarget {
    New(String),
    Existing(ObjId),
}

/// A buffered object introduction or reposition, rewritten per `spec.md`
/// §4.8 so the object never appears outside an observer's lightcone.
struct ObjectIntro {
    target: IntroTarget,
    /// World-frame position at `now`, time component already clamped.
    r_now: Vector4<f64>,
    /// Velocity at `now` — the caller's requested velocity directly when
    /// `state.r.t == now` (no rewrite needed), or zero when `state.r.t >
    /// now` (the object coasts at rest until the synthetic jump below).
    v_now: Vector3<f64>,
    tau_start: f64,
    /// If `Some`, a gap-filling `AbruptVelocityChange` (and a silent
    /// `Marker("Appear")`) is appended reaching `v` at `tau_jump`.
    jump: Option<(f64, Vector3<f64>)>,
}

/// A buffered set of writes against a `World` snapshot, evaluated at a
/// single candidate coordinate time. Either discarded (on retry) or
/// folded into a fresh `World` via [`DeltaWorld::apply_all`].
pub struct DeltaWorld<'w> {
    base: &'w World,
    evaluated_time: f64,
    candidate_space: Space,
    new_events: Vec<Event>,
    new_actions: Vec<(ObjId, Action)>,
    new_motions: Vec<(ObjId, Motion)>,
    new_objects: Vec<ObjectIntro>,
    action_state_updates: Vec<(ActionId, ActionState)>,
    completions: Vec<ActionId>,
    deactivations: Vec<ActionId>,
}

impl<'w> DeltaWorld<'w> {
    /// Wraps `base` for evaluation at `evaluated_time`, with
    /// `candidate_space` the result of advancing every object to that
    /// time (computed by the scheduler before constructing this).
    pub fn new(base: &'w World, evaluated_time: f64, candidate_space: Space) -> Self {
        DeltaWorld {
            base,
            evaluated_time,
            candidate_space,
            new_events: Vec::new(),
            new_actions: Vec::new(),
            new_motions: Vec::new(),
            new_objects: Vec::new(),
            action_state_updates: Vec::new(),
            completions: Vec::new(),
            deactivations: Vec::new(),
        }
    }

    pub fn evaluated_time(&self) -> f64 {
        self.evaluated_time
    }

    pub fn events_buffered(&self) -> &[Event] {
        &self.new_events
    }

    /// Folds every buffered write into a fresh `World`, promoting
    /// `candidate_space` to the new `space` and advancing `now` to
    /// `evaluated_time`. The original `base` is left untouched.
    ///
    /// Buffered motions/actions (both the ones a callback added directly
    /// and the synthetic ones this method appends for a future object
    /// introduction) are validated against the live timeline exactly as
    /// `Obj::add_motion`/`add_action` would at call time — an overlap
    /// surfaces as the same `SimError::InvalidMotion`/`InvalidAction`
    /// `spec.md` §7 specifies for a direct call, not a panic.
    pub fn apply_all(self) -> Result<World, SimError> {
        let mut world = self.base.clone();
        world.now = self.evaluated_time;
        world.space = self.candidate_space;

        for intro in self.new_objects {
            let id = match intro.target {
                IntroTarget::New(name) => world.add_object(&name, intro.r_now, intro.v_now, intro.tau_start),
                IntroTarget::Existing(id) => {
                    world.set_state(
                        &id,
                        State {
                            r: intro.r_now,
                            v: intro.v_now,
                            tau: intro.tau_start,
                        },
                    );
                    id
                }
            };
            if let Some((tau_jump, v)) = intro.jump {
                if tau_jump > intro.tau_start {
                    world.add_motion_to(
                        &id,
                        Motion::Inertial {
                            tau_start: intro.tau_start,
                            tau_end: tau_jump,
                        },
                    )?;
                }
                world.add_motion_to(&id, Motion::AbruptVelocityChange { tau_start: tau_jump, v })?;
                world.add_action_to(&id, Action::marker_silent("Appear", tau_jump))?;
            }
        }

        for (obj_id, motion) in self.new_motions {
            world.add_motion_to(&obj_id, motion)?;
        }
        for (obj_id, action) in self.new_actions {
            world.add_action_to(&obj_id, action)?;
        }
        for (action_id, state) in self.action_state_updates {
            world.action_states.insert(action_id, state);
        }
        for action_id in self.completions {
            world.active_actions.remove(&action_id);
            world.complete_actions.insert(action_id);
        }
        for action_id in self.deactivations {
            world.active_actions.remove(&action_id);
        }
        world.events.extend(self.new_events);

        Ok(world)
    }
}

impl<'w> WorldView for DeltaWorld<'w> {
    fn now(&self) -> f64 {
        self.base.now
    }

    fn objects(&self) -> Vec<ObjId> {
        self.base.object_ids()
    }

    fn events(&self) -> &[Event] {
        self.base.events()
    }

    fn state_in_frame(&self, obj: &ObjId, frame: &Frame) -> Result<State, SimError> {
        let s = self.candidate_space.get(obj).copied().ok_or(SimError::PastObjectIntroduction {
            now: self.evaluated_time,
            attempted: self.evaluated_time,
        })?;
        s.transform(&Frame::origin(), frame)
    }

    fn action_state(&self, action: ActionId) -> Option<&ActionState> {
        self.base.action_state(action)
    }

    fn active_actions(&self) -> Vec<ActionId> {
        self.base.active_actions().keys().copied().collect()
    }

    fn complete_actions(&self) -> Vec<ActionId> {
        self.base.complete_actions().iter().copied().collect()
    }

    fn log_actions(&self) -> bool {
        self.base.log_actions
    }

    fn add_event(&mut self, event: Event) {
        self.new_events.push(event);
    }

    fn add_action(&mut self, obj: &ObjId, action: Action) {
        self.new_actions.push((obj.clone(), action));
    }

    fn add_motion(&mut self, obj: &ObjId, motion: Motion) {
        self.new_motions.push((obj.clone(), motion));
    }

    fn add_or_set_object(&mut self, name: &str, state: State) -> Result<(), SimError> {
        let now = self.evaluated_time;
        if state.r[0] < now {
            return Err(SimError::PastObjectIntroduction { now, attempted: state.r[0] });
        }

        let target = match self.base.object_ids().into_iter().find(|id| id.as_str() == name) {
            Some(id) => IntroTarget::Existing(id),
            None => IntroTarget::New(name.to_string()),
        };

        if state.r[0] > now {
            // Future introduction/reposition: per `spec.md` §4.8, rewritten
            // so the object never appears outside an observer's lightcone,
            // regardless of whether it is brand-new or already live.
            let delta = state.r[0] - now;
            let r_now = Vector4::new(now, state.r[1], state.r[2], state.r[3]);
            let tau_start = state.tau - delta;
            self.new_objects.push(ObjectIntro {
                target,
                r_now,
                v_now: Vector3::zeros(),
                tau_start,
                jump: Some((state.tau, state.v)),
            });
        } else {
            // `state.r.t == now`: no lightcone concern, so no rewrite —
            // the object is placed directly at the caller's requested
            // state, velocity included.
            self.new_objects.push(ObjectIntro {
                target,
                r_now: state.r,
                v_now: state.v,
                tau_start: state.tau,
                jump: None,
            });
        }
        Ok(())
    }

    fn set_action_state(&mut self, action: ActionId, state: ActionState) {
        self.action_state_updates.push((action, state));
    }

    fn complete(&mut self, action: ActionId) {
        self.completions.push(action);
    }

    fn deactivate(&mut self, action: ActionId) {
        self.deactivations.push(action);
    }
}
