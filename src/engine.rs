//! The public programmatic surface of `spec.md` §6: construct an engine,
//! add objects, advance the simulation, register observers, and query the
//! resulting event log.

use crate::action::Action;
use crate::config::SimConfig;
use crate::errors::SimError;
use crate::event::{Event, EventFilter};
use crate::geometry::{State, Vector3, Vector4};
use crate::motion::Motion;
use crate::object::ObjId;
use crate::scheduler::{self, Observer};
use crate::world::World;

/// A handle returned by [`Engine::register_observer`], used to
/// [`Engine::unregister_observer`] it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle(usize);

/// Owns a [`World`] and a [`SimConfig`], and drives it forward through
/// [`crate::scheduler::simulate_to`]. This is the only type client code
/// needs to construct to run a simulation.
pub struct Engine {
    world: World,
    config: SimConfig,
    observers: Vec<Option<Box<dyn Observer>>>,
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        Engine {
            world: World::new(),
            config,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Introduces a new object at the engine's current `now`, per
    /// `spec.md` §3/§6: `(obj, r, v, tau)`.
    pub fn add_object(&mut self, name: &str, r: Vector4<f64>, v: Vector3<f64>, tau: f64) -> ObjId {
        self.world.add_object(name, r, v, tau)
    }

    /// Appends a motion to an object's timeline. Only valid before the
    /// object's worldline has advanced past the motion's `tau_start` —
    /// see `spec.md` §3, "Motions are immutable once added and may only
    /// be appended in the object's proper-time future."
    pub fn add_motion(&mut self, obj: &ObjId, motion: Motion) -> Result<(), SimError> {
        self.world
            .object_mut(obj)
            .expect("add_motion called with an ObjId not known to this Engine")
            .add_motion(motion)
    }

    /// Appends an action to an object's timeline.
    pub fn add_action(&mut self, obj: &ObjId, action: Action) -> Result<(), SimError> {
        self.world
            .object_mut(obj)
            .expect("add_action called with an ObjId not known to this Engine")
            .add_action(action)
    }

    /// Advances the simulation from its current `now` up to `t_horizon`,
    /// per `spec.md` §4.7. On error the engine's world is left as it was
    /// before the call — no partial step is retained.
    pub fn simulate_to(&mut self, t_horizon: f64) -> Result<(), SimError> {
        let advanced = scheduler::simulate_to(&self.world, t_horizon, &self.config, &mut self.observers)?;
        self.world = advanced;
        Ok(())
    }

    pub fn now(&self) -> f64 {
        self.world.now
    }

    pub fn state(&self, obj: &ObjId) -> Option<State> {
        self.world.state(obj)
    }

    pub fn events(&self) -> &[Event] {
        self.world.events()
    }

    /// Applies `filter` to the current event log, in commit order.
    pub fn query_events(&self, filter: &EventFilter) -> Vec<&Event> {
        filter.apply(self.world.events())
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer>) -> ObserverHandle {
        self.observers.push(Some(observer));
        ObserverHandle(self.observers.len() - 1)
    }

    pub fn unregister_observer(&mut self, handle: ObserverHandle) {
        if let Some(slot) = self.observers.get_mut(handle.0) {
            *slot = None;
        }
    }

    /// Direct access to the underlying world, for tests and advanced
    /// callers that need to inspect `activeActions`/`completeActions`
    /// directly rather than through the `Engine` façade.
    pub fn world(&self) -> &World {
        &self.world
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
