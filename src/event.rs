//! Mutation events and listener plumbing for flat sources.
//!
//! Every mutation on an [`EventedSource`](crate::wrapper::EventedSource)
//! produces two events: one with `before_update` set right before the store
//! changes, and one with it cleared right after. A failed mutation emits
//! only the before event.

use std::any::Any;
use std::rc::Rc;

use crate::value::ConfigValue;

/// The kind of mutation an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A value was added at a key.
    AddProperty,
    /// The value at a key was replaced.
    ModifyProperty,
    /// A key and its value were removed.
    ClearProperty,
    /// The whole source was emptied.
    ClearSource,
}

/// A mutation notification from an evented source.
#[derive(Clone)]
pub struct SourceEvent {
    /// Process-unique identifier of the emitting source, stable across both
    /// events of a pair.
    pub source_id: u64,
    /// What happened.
    pub kind: EventKind,
    /// The affected key; `None` for whole-source operations.
    pub property_name: Option<String>,
    /// The value involved in the mutation, when one exists.
    pub property_value: Option<ConfigValue>,
    /// True on the event sent before the store changes, false on the one
    /// sent after.
    pub before_update: bool,
    /// Extra payload slot for richer event kinds; the built-in mutation
    /// events never carry one.
    pub data: Option<Rc<dyn Any>>,
}

impl PartialEq for SourceEvent {
    fn eq(&self, other: &Self) -> bool {
        let data_eq = match (&self.data, &other.data) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        self.source_id == other.source_id
            && self.kind == other.kind
            && self.property_name == other.property_name
            && self.property_value == other.property_value
            && self.before_update == other.before_update
            && data_eq
    }
}

impl std::fmt::Debug for SourceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceEvent")
            .field("source_id", &self.source_id)
            .field("kind", &self.kind)
            .field("property_name", &self.property_name)
            .field("property_value", &self.property_value)
            .field("before_update", &self.before_update)
            .field("data", &self.data.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Receives mutation events from an evented source.
pub trait SourceListener {
    fn source_changed(&self, event: &SourceEvent);
}

/// A set of listeners notified of every event.
///
/// Listener identity is `Rc` pointer identity: removing a listener requires
/// the same `Rc` that was registered, not a structurally equal one.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<Rc<dyn SourceListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. The same listener may be registered more than
    /// once and is then notified once per registration.
    pub fn add(&mut self, listener: Rc<dyn SourceListener>) {
        self.listeners.push(listener);
    }

    /// Removes one registration of the listener, matched by pointer
    /// identity. Returns whether a registration was removed.
    pub fn remove(&mut self, listener: &Rc<dyn SourceListener>) -> bool {
        match self
            .listeners
            .iter()
            .position(|existing| Rc::ptr_eq(existing, listener))
        {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers the event to every listener. The list is copied first so a
    /// listener adding or removing listeners during delivery does not
    /// affect the ongoing notification round.
    pub fn notify(&self, event: &SourceEvent) {
        let current: Vec<Rc<dyn SourceListener>> =
            self.listeners.iter().map(Rc::clone).collect();
        for listener in current {
            listener.source_changed(event);
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<SourceEvent>>,
    }

    impl SourceListener for Recorder {
        fn source_changed(&self, event: &SourceEvent) {
            self.events.borrow_mut().push(event.clone());
        }
    }

    fn sample_event() -> SourceEvent {
        SourceEvent {
            source_id: 1,
            kind: EventKind::AddProperty,
            property_name: Some("key".to_string()),
            property_value: Some(ConfigValue::from("value")),
            before_update: true,
            data: None,
        }
    }

    #[test]
    fn test_notify_reaches_all_listeners() {
        let mut registry = ListenerRegistry::new();
        let a = Rc::new(Recorder::default());
        let b = Rc::new(Recorder::default());
        registry.add(a.clone());
        registry.add(b.clone());

        registry.notify(&sample_event());
        assert_eq!(a.events.borrow().len(), 1);
        assert_eq!(b.events.borrow().len(), 1);
    }

    #[test]
    fn test_remove_matches_pointer_identity() {
        let mut registry = ListenerRegistry::new();
        let registered = Rc::new(Recorder::default());
        registry.add(registered.clone());

        // structurally identical but a different allocation
        let stranger: Rc<dyn SourceListener> = Rc::new(Recorder::default());
        assert!(!registry.remove(&stranger));
        assert_eq!(registry.len(), 1);

        let handle: Rc<dyn SourceListener> = registered.clone();
        assert!(registry.remove(&handle));
        assert!(registry.is_empty());
        assert!(!registry.remove(&handle));
    }

    #[test]
    fn test_duplicate_registration_notifies_twice() {
        let mut registry = ListenerRegistry::new();
        let listener = Rc::new(Recorder::default());
        registry.add(listener.clone());
        registry.add(listener.clone());

        registry.notify(&sample_event());
        assert_eq!(listener.events.borrow().len(), 2);

        let handle: Rc<dyn SourceListener> = listener.clone();
        assert!(registry.remove(&handle));
        registry.notify(&sample_event());
        assert_eq!(listener.events.borrow().len(), 3);
    }
}
