//! Events: the causal log of `spec.md` §3, plus an `EventFilter` query
//! builder over it (`spec.md` §6, "query events by filters").

use regex::Regex;

use crate::geometry::State;
use crate::object::{ActionId, ObjId};

/// One entry in the world's event log: a named occurrence relating a
/// sender and a receiver, each pinned to its world-frame `State` at the
/// moment the event fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub cause: ActionId,
    pub sender_obj: ObjId,
    pub sender_state: State,
    pub receiver_obj: ObjId,
    pub receiver_state: State,
}

impl Event {
    pub fn new(
        name: &str,
        cause: ActionId,
        sender_obj: ObjId,
        sender_state: State,
        receiver_obj: ObjId,
        receiver_state: State,
    ) -> Event {
        Event {
            name: name.to_string(),
            cause,
            sender_obj,
            sender_state,
            receiver_obj,
            receiver_state,
        }
    }

    /// World-frame coordinate time the event fired at, i.e. the
    /// receiver's time component — the event is logged at the moment the
    /// receiver witnesses it.
    pub fn world_time(&self) -> f64 {
        self.receiver_state.r[0]
    }
}

/// A read-side, composable filter over `World::events`. Every predicate
/// is optional; an unset predicate matches everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    name: Option<String>,
    name_regex: Option<String>,
    sender: Option<ObjId>,
    receiver: Option<ObjId>,
    time_range: Option<(f64, f64)>,
    proper_time_range: Option<(f64, f64)>,
}

impl EventFilter {
    pub fn new() -> Self {
        EventFilter::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name_matching(mut self, pattern: impl Into<String>) -> Self {
        self.name_regex = Some(pattern.into());
        self
    }

    pub fn sender(mut self, obj: ObjId) -> Self {
        self.sender = Some(obj);
        self
    }

    pub fn receiver(mut self, obj: ObjId) -> Self {
        self.receiver = Some(obj);
        self
    }

    pub fn time_range(mut self, from: f64, to: f64) -> Self {
        self.time_range = Some((from, to));
        self
    }

    pub fn proper_time_range(mut self, from: f64, to: f64) -> Self {
        self.proper_time_range = Some((from, to));
        self
    }

    /// Applies this filter to `events`, returning the matching subset in
    /// their original (commit) order. A malformed `name_matching`
    /// pattern matches nothing rather than panicking.
    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        let compiled = self.name_regex.as_ref().and_then(|p| Regex::new(p).ok());

        events
            .iter()
            .filter(|e| self.name.as_ref().map_or(true, |n| &e.name == n))
            .filter(|e| match &self.name_regex {
                Some(_) => compiled.as_ref().map_or(false, |re| re.is_match(&e.name)),
                None => true,
            })
            .filter(|e| self.sender.as_ref().map_or(true, |s| &e.sender_obj == s))
            .filter(|e| self.receiver.as_ref().map_or(true, |r| &e.receiver_obj == r))
            .filter(|e| {
                self.time_range
                    .map_or(true, |(from, to)| e.world_time() >= from && e.world_time() <= to)
            })
            .filter(|e| {
                self.proper_time_range.map_or(true, |(from, to)| {
                    e.receiver_state.tau >= from && e.receiver_state.tau <= to
                })
            })
            .collect()
    }
}
