//! Event-emitting decorator over flat sources.

use std::any::{Any, TypeId};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ConfigResult;
use crate::event::{EventKind, ListenerRegistry, SourceEvent, SourceListener};
use crate::source::FlatSource;
use crate::value::ConfigValue;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Wraps any [`FlatSource`] and notifies registered listeners of every
/// mutation.
///
/// Each mutation produces a pair of [`SourceEvent`]s carrying the same
/// `source_id`: one with `before_update` set, delivered before the inner
/// source changes, and one with it cleared, delivered after. When the inner
/// source rejects a mutation, the error propagates and the after event is
/// never sent. Reads pass straight through and emit nothing.
pub struct EventedSource {
    inner: Box<dyn FlatSource>,
    listeners: ListenerRegistry,
    source_id: u64,
}

impl EventedSource {
    /// Wraps a source. The wrapper takes ownership; all further access must
    /// go through it for events to stay accurate.
    pub fn new(inner: Box<dyn FlatSource>) -> Self {
        Self {
            inner,
            listeners: ListenerRegistry::new(),
            source_id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The process-unique identifier carried by every event this wrapper
    /// emits.
    pub fn source_id(&self) -> u64 {
        self.source_id
    }

    /// Registers a mutation listener.
    pub fn add_listener(&mut self, listener: Rc<dyn SourceListener>) {
        self.listeners.add(listener);
    }

    /// Removes one registration of the listener, matched by pointer
    /// identity. Returns whether a registration was removed.
    pub fn remove_listener(&mut self, listener: &Rc<dyn SourceListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Unwraps the decorator, discarding all listeners.
    pub fn into_inner(self) -> Box<dyn FlatSource> {
        self.inner
    }

    fn event(
        &self,
        kind: EventKind,
        name: Option<&str>,
        value: Option<&ConfigValue>,
        before_update: bool,
    ) -> SourceEvent {
        SourceEvent {
            source_id: self.source_id,
            kind,
            property_name: name.map(str::to_string),
            property_value: value.cloned(),
            before_update,
            data: None,
        }
    }

    /// Emits the before event, runs the mutation, and emits the after event
    /// only if the mutation succeeded.
    fn with_events(
        &mut self,
        kind: EventKind,
        name: Option<&str>,
        value: Option<&ConfigValue>,
        op: impl FnOnce(&mut dyn FlatSource) -> ConfigResult<()>,
    ) -> ConfigResult<()> {
        self.listeners.notify(&self.event(kind, name, value, true));
        op(self.inner.as_mut())?;
        self.listeners.notify(&self.event(kind, name, value, false));
        Ok(())
    }
}

impl FlatSource for EventedSource {
    fn get_property(&self, key: &str) -> Option<ConfigValue> {
        self.inner.get_property(key)
    }

    fn add_property(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        self.with_events(EventKind::AddProperty, Some(key), Some(&value), |inner| {
            inner.add_property(key, value.clone())
        })
    }

    fn set_property(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        self.with_events(EventKind::ModifyProperty, Some(key), Some(&value), |inner| {
            inner.set_property(key, value.clone())
        })
    }

    fn clear_property(&mut self, key: &str) -> ConfigResult<()> {
        self.with_events(EventKind::ClearProperty, Some(key), None, |inner| {
            inner.clear_property(key)
        })
    }

    fn clear(&mut self) -> ConfigResult<()> {
        self.with_events(EventKind::ClearSource, None, None, |inner| inner.clear())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner.keys_with_prefix(prefix)
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn value_count(&self, key: &str) -> usize {
        self.inner.value_count(key)
    }

    fn capability(&self, type_id: TypeId) -> Option<Rc<dyn Any>> {
        self.inner.capability(type_id)
    }
}

impl std::fmt::Debug for EventedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedSource")
            .field("source_id", &self.source_id)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
