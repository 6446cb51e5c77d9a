//! `relsim` simulates the worldlines of discrete objects in flat 3+1-dimensional
//! spacetime under special relativity.
//!
//! An [`Engine`](engine::Engine) owns a set of named objects, each described by a
//! piecewise history of [`Motion`](motion::Motion)s (inertial coasting, instantaneous
//! velocity changes, constant proper acceleration) and a set of scheduled
//! [`Action`](action::Action)s (markers, light pulses, collision detectors, user
//! callbacks). Calling [`Engine::simulate_to`](engine::Engine::simulate_to) advances a
//! world-frame coordinate time up to a requested horizon, firing actions in
//! non-decreasing coordinate-time order and recording every firing, pulse
//! reception and collision as an [`Event`](event::Event).
//!
//! The hard part lives in [`scheduler`]: choosing the next action to fire,
//! advancing every object's kinematics to that instant, running the fired
//! action(s) against a buffered candidate world, and bisecting the step when an
//! action reports it was invoked past a threshold event.
//!
//! Out of scope: general relativity, gravity, frame rotation, lateral
//! acceleration, real-time/interactive stepping, persistence, and any
//! command-line or wire-serialization surface. See `SPEC_FULL.md` in the
//! repository root for the full requirements this crate implements.

pub mod action;
pub mod config;
pub mod delta_world;
pub mod engine;
pub mod errors;
pub mod event;
pub mod geometry;
pub mod math;
pub mod motion;
pub mod object;
pub mod scheduler;
pub mod world;

pub use action::{Action, Cause, RetrySmallerStep};
pub use config::SimConfig;
pub use engine::{Engine, ObserverHandle};
pub use errors::SimError;
pub use event::{Event, EventFilter};
pub use geometry::{Frame, State, Vector3, Vector4};
pub use motion::Motion;
pub use object::{ActionId, Obj, ObjId};
pub use scheduler::{ObservedWorld, Observer, ObserverSignal};
