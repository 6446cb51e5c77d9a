//! The simulate-to loop of `spec.md` §4.7 — the heart of the system.
//!
//! One call to [`simulate_to`] advances a [`World`] from its current
//! `now` up to `t_horizon`, firing actions in non-decreasing world-frame
//! coordinate-time order. Each outer iteration:
//!
//! 1. picks the earliest pending action across every object
//!    ([`find_earliest`]),
//! 2. clamps it to the horizon,
//! 3. takes the fast path straight to the horizon if nothing is pending
//!    or active,
//! 4. otherwise runs the transactional inner loop ([`run_step`]), which
//!    builds a candidate [`DeltaWorld`], fires the earliest action plus
//!    every currently active action against it, and bisects the target
//!    time whenever an action raises [`RetrySmallerStep`],
//! 5. performs the completion bookkeeping of §4.7 step 5 for whichever
//!    action was selected as earliest, and
//! 6. runs registered observers, stopping early if any asks to.

use log::{debug, warn};

use crate::action::{Action, ActionState, RetrySmallerStep};
use crate::config::SimConfig;
use crate::delta_world::{DeltaWorld, WorldView};
use crate::errors::SimError;
use crate::event::Event;
use crate::geometry::State;
use crate::object::{advance_to_coordinate_time, advance_to_proper_time, ActionId, ObjId};
use crate::world::{Space, World};

/// Read-only view handed to [`Observer::on_commit`] after every committed
/// step. A thin wrapper rather than `&World` directly, so that observers
/// are insulated from `World`'s internal representation — mirrors
/// `spec.md` §4.7 step 6's "read-only view".
pub struct ObservedWorld<'w>(&'w World);

impl<'w> ObservedWorld<'w> {
    pub fn now(&self) -> f64 {
        self.0.now
    }

    pub fn events(&self) -> &[Event] {
        self.0.events()
    }

    pub fn state(&self, obj: &ObjId) -> Option<State> {
        self.0.state(obj)
    }

    pub fn object_ids(&self) -> Vec<ObjId> {
        self.0.object_ids()
    }
}

/// What an [`Observer`] returns after examining a committed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverSignal {
    Continue,
    Stop,
}

/// Registered against an [`crate::engine::Engine`]; invoked once per
/// committed scheduler step (`spec.md` §4.7 step 6, §6 "register/
/// unregister observers").
pub trait Observer: Send {
    fn on_commit(&mut self, world: &ObservedWorld<'_>) -> ObserverSignal;
}

/// The candidate `(object, action, world-frame state at the action's own
/// `tau_start`)` chosen in §4.7 step 1.
#[derive(Clone)]
struct Earliest {
    obj: ObjId,
    action: Action,
    state: State,
}

/// §4.7 step 1: for every object, the earliest action not yet complete or
/// active, advanced to the world-frame coordinate time its `tau_start`
/// falls at; the overall earliest among all objects, tie-broken by
/// smaller `state.r.t` and then by object iteration order.
fn find_earliest(world: &World, config: &SimConfig) -> Result<Option<Earliest>, SimError> {
    let mut best: Option<Earliest> = None;
    for id in world.object_ids() {
        let obj = world.object(&id).expect("object_ids only returns live objects");
        let pending = obj.first_action_matching(|a| !world.is_complete(a.id) && !world.is_active(a.id));
        let Some(action) = pending else { continue };
        let current = world.state(&id).expect("every live object has a world-frame state");
        let state = advance_to_proper_time(obj, &current, action.tau_start, config.eps)?;

        let is_better = match &best {
            None => true,
            Some(b) => state.r[0] < b.state.r[0],
        };
        if is_better {
            best = Some(Earliest {
                obj: id,
                action: action.clone(),
                state,
            });
        }
    }
    Ok(best)
}

/// All actions currently in `activeActions`, in the deterministic order
/// of `spec.md` §9's "Deterministic ordering" design note: by object
/// iteration order, then by each object's own stable action order —
/// never by `HashMap` iteration, which is unordered.
fn active_actions_ordered(world: &World) -> Vec<(ObjId, Action)> {
    let mut result = Vec::new();
    for id in world.object_ids() {
        if let Some(obj) = world.object(&id) {
            for a in obj.actions() {
                if world.is_active(a.id) {
                    result.push((id.clone(), a.clone()));
                }
            }
        }
    }
    result
}

/// §4.7 step 4: the transactional inner loop. Builds and commits
/// candidate worlds at `evaluated_time`, bisecting between `fallback_time`
/// (the last coordinate time successfully committed in this step) and
/// `target_time` (the time we are ultimately trying to reach) whenever an
/// action raises [`RetrySmallerStep`]. Returns the world committed at
/// `target_time`.
fn run_step(base: World, earliest: &Option<Earliest>, target_time: f64, config: &SimConfig) -> Result<World, SimError> {
    let mut world = base;
    let mut target_time = target_time;
    let mut fallback_time = world.now;
    let mut evaluated_time = target_time;
    let mut retries: u32 = 0;

    loop {
        let mut space = Space::new();
        for id in world.object_ids() {
            let obj = world.object(&id).expect("object_ids only returns live objects");
            let current = world.state(&id).expect("every live object has a world-frame state");
            let reuse_earliest = earliest
                .as_ref()
                .map_or(false, |e| e.obj == id && evaluated_time == e.state.r[0]);
            let state = if reuse_earliest {
                earliest.as_ref().unwrap().state
            } else {
                advance_to_coordinate_time(obj, &current, evaluated_time, config.eps)?
            };
            space.insert(id, state);
        }

        let mut delta = DeltaWorld::new(&world, evaluated_time, space);

        let mut fired = active_actions_ordered(&world);
        let earliest_fires_now = earliest.as_ref().map_or(false, |e| evaluated_time == e.state.r[0]);
        if earliest_fires_now {
            let e = earliest.as_ref().unwrap();
            fired.push((e.obj.clone(), e.action.clone()));
        }

        let mut retry_signal: Option<RetrySmallerStep> = None;
        for (owner, action) in &fired {
            let prev_state = world.action_state(action.id).cloned().unwrap_or(ActionState::Init);
            match action.act(&mut delta, owner, evaluated_time, &prev_state, config.eps) {
                Ok(next_state) => delta.set_action_state(action.id, next_state),
                Err(retry) => {
                    if retry_signal.is_none() {
                        retry_signal = Some(retry);
                    }
                }
            }
        }

        if let Some(retry) = retry_signal {
            retries += 1;
            debug!(
                "action raised RetrySmallerStep at t={} (attempt {}, hint={:?})",
                evaluated_time, retries, retry.hint
            );
            if retries > config.max_retries {
                return Err(SimError::ExcessiveRetries {
                    at: evaluated_time,
                    limit: config.max_retries,
                });
            }

            if (fallback_time - evaluated_time).abs() < config.eps {
                warn!(
                    "precision limit reached while bisecting near t={}; proceeding with the current evaluation",
                    evaluated_time
                );
                // Fall through to commit below with whatever this attempt buffered.
            } else {
                let old_evaluated = evaluated_time;
                target_time = old_evaluated;
                let span = old_evaluated - fallback_time;
                evaluated_time = match retry.hint {
                    Some(h) if h > fallback_time && h < old_evaluated => h.clamp(
                        fallback_time + config.hint_clamp_fraction * span,
                        old_evaluated - config.hint_clamp_fraction * span,
                    ),
                    _ => (fallback_time + old_evaluated) / 2.0,
                };
                continue;
            }
        }

        world = delta.apply_all()?;

        if evaluated_time < target_time {
            fallback_time = evaluated_time;
            evaluated_time = target_time;
            continue;
        }
        break;
    }

    Ok(world)
}

/// §4.7 step 5: completion bookkeeping for whichever action was selected
/// as `earliest` this iteration (it always fires exactly at its own
/// `tau_start`, which [`run_step`] guarantees is the final committed
/// `now`).
fn finalize_earliest(mut world: World, earliest: &Earliest) -> World {
    let action = &earliest.action;

    if action.tau_start == action.tau_end {
        world.complete_actions.insert(action.id);
    } else {
        world.active_actions.insert(action.id, earliest.obj.clone());
        if action.tau_end.is_finite() {
            let finisher = Action::finisher(action);
            world
                .add_action_to(&earliest.obj, finisher)
                .expect("a freshly scheduled finisher action never overlaps an existing one");
        }
    }

    // Named literally "Action" rather than `action.cause.name`: some kinds
    // (`Pulse`, `DetectCollision`) already emit their own cause-named
    // events for the domain occurrences they detect, and this generic
    // firing marker must stay distinguishable from those. `Event::cause`
    // still pins this event to the specific `Action` that fired.
    if world.log_actions && !action.cause.silent {
        if let Some(state) = world.state(&earliest.obj) {
            world
                .events
                .push(Event::new("Action", action.id, earliest.obj.clone(), state, earliest.obj.clone(), state));
        }
    }

    world
}

/// Advances `world` from its current `now` to `t_horizon`, per
/// `spec.md` §4.7. Returns the advanced world, or the first
/// [`SimError`] raised along the way (the world is not mutated in place;
/// on error the caller's original world is left untouched).
pub fn simulate_to(
    world: &World,
    t_horizon: f64,
    config: &SimConfig,
    observers: &mut [Option<Box<dyn Observer>>],
) -> Result<World, SimError> {
    let mut world = world.clone();

    while world.now < t_horizon {
        let mut earliest = find_earliest(&world, config)?;
        if earliest.as_ref().map_or(false, |e| e.state.r[0] > t_horizon) {
            earliest = None;
        }

        if earliest.is_none() && world.active_actions().is_empty() {
            let mut space = Space::new();
            for id in world.object_ids() {
                let obj = world.object(&id).expect("object_ids only returns live objects");
                let current = world.state(&id).expect("every live object has a world-frame state");
                let advanced = advance_to_coordinate_time(obj, &current, t_horizon, config.eps)?;
                space.insert(id, advanced);
            }
            world.space = space;
            world.now = t_horizon;
            notify_observers(&world, observers);
            break;
        }

        let target_time = earliest.as_ref().map(|e| e.state.r[0]).unwrap_or(t_horizon);
        world = run_step(world, &earliest, target_time, config)?;

        if let Some(e) = &earliest {
            world = finalize_earliest(world, e);
        }

        if notify_observers(&world, observers) == ObserverSignal::Stop {
            break;
        }
    }

    Ok(world)
}

fn notify_observers(world: &World, observers: &mut [Option<Box<dyn Observer>>]) -> ObserverSignal {
    let view = ObservedWorld(world);
    let mut signal = ObserverSignal::Continue;
    for slot in observers.iter_mut() {
        if let Some(obs) = slot {
            if obs.on_commit(&view) == ObserverSignal::Stop {
                signal = ObserverSignal::Stop;
            }
        }
    }
    signal
}
