//! The authoritative simulation state of `spec.md` §3:
//! `(now, objects, space, activeActions, completeActions, actionStates, events)`.
//!
//! `World` itself is never mutated mid-step — the scheduler only ever
//! replaces it wholesale with the result of committing a `DeltaWorld`
//! (`crate::delta_world`).

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::action::{Action, ActionState};
use crate::errors::SimError;
use crate::event::Event;
use crate::geometry::{Frame, State, Vector3, Vector4};
use crate::motion::Motion;
use crate::object::{ActionId, Obj, ObjId};

/// The object -> current-world-frame-State map named `space` in
/// `spec.md` §3.
pub type Space = HashMap<ObjId, State>;

/// The simulation's full state at a single world-frame coordinate time.
#[derive(Debug, Clone)]
pub struct World {
    pub now: f64,
    pub(crate) objects: BTreeMap<ObjId, Obj>,
    /// Object insertion order, kept separately from `objects` (a
    /// `BTreeMap` for `O(log n)` lookup by name, which iterates in
    /// ascending-name rather than insertion order). `spec.md` §9's
    /// "Deterministic ordering" note requires iteration in insertion
    /// order — this is the index that provides it.
    pub(crate) insertion_order: Vec<ObjId>,
    pub(crate) space: Space,
    pub(crate) active_actions: HashMap<ActionId, ObjId>,
    pub(crate) complete_actions: HashSet<ActionId>,
    pub(crate) action_states: HashMap<ActionId, ActionState>,
    pub(crate) events: Vec<Event>,
    /// Whether firing an action (that isn't itself silent) also emits a
    /// generic `Action`/`Action-end` event. Read through `WorldView` as
    /// the `logActions` flag of `spec.md` §4.8.
    pub log_actions: bool,
}

impl World {
    pub fn new() -> Self {
        World {
            now: 0.0,
            objects: BTreeMap::new(),
            insertion_order: Vec::new(),
            space: HashMap::new(),
            active_actions: HashMap::new(),
            complete_actions: HashSet::new(),
            action_states: HashMap::new(),
            events: Vec::new(),
            log_actions: true,
        }
    }

    /// Introduces a new object at world time `self.now`, per `spec.md`
    /// §3 ("Objects are created by client code before `simulateTo` ...
    /// in the current frame").
    pub fn add_object(&mut self, name: &str, r: Vector4<f64>, v: Vector3<f64>, tau: f64) -> ObjId {
        let obj = Obj::new(name);
        let id = obj.id.clone();
        self.objects.insert(id.clone(), obj);
        self.insertion_order.push(id.clone());
        self.space.insert(id.clone(), State { r, v, tau });
        id
    }

    pub fn object(&self, id: &ObjId) -> Option<&Obj> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: &ObjId) -> Option<&mut Obj> {
        self.objects.get_mut(id)
    }

    /// All live objects, in insertion order (`spec.md` §9).
    pub fn object_ids(&self) -> Vec<ObjId> {
        self.insertion_order.clone()
    }

    /// The object's current State, in the world-origin frame.
    pub fn state(&self, id: &ObjId) -> Option<State> {
        self.space.get(id).copied()
    }

    pub fn set_state(&mut self, id: &ObjId, state: State) {
        self.space.insert(id.clone(), state);
    }

    /// The object's current State transformed into `frame`.
    pub fn state_in_frame(&self, id: &ObjId, frame: &Frame) -> Result<State, SimError> {
        let s = self
            .state(id)
            .ok_or_else(|| SimError::PastObjectIntroduction { now: self.now, attempted: self.now })?;
        s.transform(&Frame::origin(), frame)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn active_actions(&self) -> &HashMap<ActionId, ObjId> {
        &self.active_actions
    }

    pub fn complete_actions(&self) -> &HashSet<ActionId> {
        &self.complete_actions
    }

    pub fn action_state(&self, id: ActionId) -> Option<&ActionState> {
        self.action_states.get(&id)
    }

    pub fn is_complete(&self, id: ActionId) -> bool {
        self.complete_actions.contains(&id)
    }

    pub fn is_active(&self, id: ActionId) -> bool {
        self.active_actions.contains_key(&id)
    }

    pub(crate) fn add_action_to(&mut self, obj: &ObjId, action: Action) -> Result<(), SimError> {
        self.objects
            .get_mut(obj)
            .expect("DeltaWorld only ever targets objects that exist in this World")
            .add_action(action)
    }

    pub(crate) fn add_motion_to(&mut self, obj: &ObjId, motion: Motion) -> Result<(), SimError> {
        self.objects
            .get_mut(obj)
            .expect("DeltaWorld only ever targets objects that exist in this World")
            .add_motion(motion)
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_object_is_queryable_at_the_world_origin() {
        let mut w = World::new();
        let id = w.add_object("ship", Vector4::zeros(), Vector3::zeros(), 0.0);
        assert!(w.state(&id).is_some());
        assert_eq!(w.object_ids(), vec![id]);
    }

    #[test]
    fn object_ids_preserve_insertion_order_not_name_order() {
        let mut w = World::new();
        let z = w.add_object("zeta", Vector4::zeros(), Vector3::zeros(), 0.0);
        let a = w.add_object("alpha", Vector4::zeros(), Vector3::zeros(), 0.0);
        let m = w.add_object("mu", Vector4::zeros(), Vector3::zeros(), 0.0);
        assert_eq!(w.object_ids(), vec![z, a, m]);
    }

    #[test]
    fn fresh_world_has_no_events_or_active_actions() {
        let w = World::new();
        assert!(w.events().is_empty());
        assert!(w.active_actions().is_empty());
    }
}
