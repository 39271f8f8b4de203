//! Synchronous, ordered delivery of lever events to registered observers.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::warn;

/// The discrete notifications a lever can publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Grabbed,
    Released,
    Moved,
    Activated,
    Deactivated,
    Toggled,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Grabbed => write!(f, "grabbed"),
            EventKind::Released => write!(f, "released"),
            EventKind::Moved => write!(f, "moved"),
            EventKind::Activated => write!(f, "activated"),
            EventKind::Deactivated => write!(f, "deactivated"),
            EventKind::Toggled => write!(f, "toggled"),
        }
    }
}

/// An event together with its payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeverEvent {
    Grabbed,
    Released,
    /// The angle after the move.
    Moved(f32),
    Activated,
    Deactivated,
    Toggled,
}

impl LeverEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LeverEvent::Grabbed => EventKind::Grabbed,
            LeverEvent::Released => EventKind::Released,
            LeverEvent::Moved(_) => EventKind::Moved,
            LeverEvent::Activated => EventKind::Activated,
            LeverEvent::Deactivated => EventKind::Deactivated,
            LeverEvent::Toggled => EventKind::Toggled,
        }
    }
}

pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;
pub type ObserverResult = Result<(), ObserverError>;

type Observer = Box<dyn FnMut(&LeverEvent) -> ObserverResult>;

/// Handle returned by [`EventDispatch::subscribe`], used to unsubscribe later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Per-kind observer lists.
///
/// Delivery is synchronous and follows registration order. A failing or panicking observer
/// is logged and skipped; the remaining observers still receive the event.
#[derive(Default)]
pub struct EventDispatch {
    observers: HashMap<EventKind, Vec<(ObserverId, Observer)>>,
    next_id: u64,
}

impl fmt::Debug for EventDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .observers
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        f.debug_struct("EventDispatch")
            .field("observers", &counts)
            .finish()
    }
}

impl EventDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fallible observer for `kind`.
    pub fn subscribe<F>(&mut self, kind: EventKind, observer: F) -> ObserverId
    where
        F: FnMut(&LeverEvent) -> ObserverResult + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers
            .entry(kind)
            .or_default()
            .push((id, Box::new(observer)));
        id
    }

    /// Registers an observer that cannot fail.
    pub fn on<F>(&mut self, kind: EventKind, mut observer: F) -> ObserverId
    where
        F: FnMut(&LeverEvent) + 'static,
    {
        self.subscribe(kind, move |event| {
            observer(event);
            Ok(())
        })
    }

    /// Removes an observer. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        for list in self.observers.values_mut() {
            if let Some(pos) = list.iter().position(|(oid, _)| *oid == id) {
                drop(list.remove(pos));
                return true;
            }
        }
        false
    }

    /// Number of observers subscribed to `kind`.
    pub fn observer_count(&self, kind: EventKind) -> usize {
        self.observers.get(&kind).map_or(0, Vec::len)
    }

    /// Delivers `event` to every observer of its kind.
    ///
    /// Returns how many observers handled it successfully.
    pub fn emit(&mut self, event: LeverEvent) -> usize {
        let kind = event.kind();
        let Some(list) = self.observers.get_mut(&kind) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, observer) in list.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| observer(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!("Observer {:?} failed on {} event: {}", id, kind, e),
                Err(_) => warn!("Observer {:?} panicked on {} event", id, kind),
            }
        }
        delivered
    }
}
