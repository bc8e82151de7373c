//! Integration tests for the event-emitting source decorator.
//!
//! Every mutation through the wrapper must produce a before/after event
//! pair; failed mutations stop after the before event. Listener management
//! works on pointer identity, and capabilities pass straight through to the
//! wrapped source.

use std::cell::RefCell;
use std::rc::Rc;

use canopy::{
    ConfigError, ConfigResult, ConfigValue, EventKind, EventedSource, FlatSource, FlatSourceExt,
    MapSource, SourceEvent, SourceListener,
};

/// Listener that records every event it receives.
#[derive(Default)]
struct RecordingListener {
    events: RefCell<Vec<SourceEvent>>,
}

impl RecordingListener {
    fn take(&self) -> Vec<SourceEvent> {
        self.events.borrow_mut().drain(..).collect()
    }
}

impl SourceListener for RecordingListener {
    fn source_changed(&self, event: &SourceEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

fn wrapped() -> (EventedSource, Rc<RecordingListener>) {
    let mut source = EventedSource::new(Box::new(MapSource::new()));
    let listener = Rc::new(RecordingListener::default());
    source.add_listener(listener.clone());
    (source, listener)
}

/// Asserts that `events` is a matching before/after pair for one mutation.
fn assert_pair(
    events: &[SourceEvent],
    source_id: u64,
    kind: EventKind,
    name: Option<&str>,
    value: Option<&ConfigValue>,
) {
    assert_eq!(events.len(), 2, "expected a before/after pair");
    for (event, before) in events.iter().zip([true, false]) {
        assert_eq!(event.source_id, source_id);
        assert_eq!(event.kind, kind);
        assert_eq!(event.property_name.as_deref(), name);
        assert_eq!(event.property_value.as_ref(), value);
        assert_eq!(event.before_update, before);
        assert!(event.data.is_none());
    }
}

#[test]
fn test_add_property_event_pair() {
    let (mut source, listener) = wrapped();
    let value = ConfigValue::from("simple");
    source.add_property("test", value.clone()).unwrap();

    assert_pair(
        &listener.take(),
        source.source_id(),
        EventKind::AddProperty,
        Some("test"),
        Some(&value),
    );
    assert_eq!(source.get_property("test"), Some(value));
}

#[test]
fn test_set_property_event_pair() {
    let (mut source, listener) = wrapped();
    source.set_property("test", ConfigValue::from(1i64)).unwrap();
    listener.take();

    let value = ConfigValue::from(42i64);
    source.set_property("test", value.clone()).unwrap();
    assert_pair(
        &listener.take(),
        source.source_id(),
        EventKind::ModifyProperty,
        Some("test"),
        Some(&value),
    );
    assert_eq!(source.get_property("test"), Some(value));
}

#[test]
fn test_clear_property_event_pair() {
    let (mut source, listener) = wrapped();
    source.set_property("test", ConfigValue::from(1i64)).unwrap();
    listener.take();

    source.clear_property("test").unwrap();
    assert_pair(
        &listener.take(),
        source.source_id(),
        EventKind::ClearProperty,
        Some("test"),
        None,
    );
    assert!(!source.contains_key("test"));
}

#[test]
fn test_clear_source_event_pair() {
    let (mut source, listener) = wrapped();
    source.set_property("a", ConfigValue::from(1i64)).unwrap();
    source.set_property("b", ConfigValue::from(2i64)).unwrap();
    listener.take();

    source.clear().unwrap();
    assert_pair(
        &listener.take(),
        source.source_id(),
        EventKind::ClearSource,
        None,
        None,
    );
    assert!(source.is_empty());
}

#[test]
fn test_reads_are_silent() {
    let (mut source, listener) = wrapped();
    source.set_property("key", ConfigValue::from("value")).unwrap();
    listener.take();

    assert_eq!(source.get_property("key"), Some(ConfigValue::from("value")));
    assert!(source.contains_key("key"));
    assert_eq!(source.keys(), vec!["key"]);
    assert_eq!(source.size(), 1);
    assert_eq!(source.value_count("key"), 1);
    assert!(listener.take().is_empty());
}

#[test]
fn test_multiple_listeners_each_get_the_pair() {
    let (mut source, first) = wrapped();
    let second = Rc::new(RecordingListener::default());
    source.add_listener(second.clone());

    source.add_property("key", ConfigValue::from(1i64)).unwrap();
    assert_eq!(first.take().len(), 2);
    assert_eq!(second.take().len(), 2);
}

#[test]
fn test_remove_listener_requires_identity() {
    let (mut source, listener) = wrapped();

    // a structurally equal listener is not the registered one
    let imposter: Rc<dyn SourceListener> = Rc::new(RecordingListener::default());
    assert!(!source.remove_listener(&imposter));
    assert_eq!(source.listener_count(), 1);

    let handle: Rc<dyn SourceListener> = listener.clone();
    assert!(source.remove_listener(&handle));
    assert_eq!(source.listener_count(), 0);
    // removing twice reports failure
    assert!(!source.remove_listener(&handle));

    source.set_property("key", ConfigValue::from(1i64)).unwrap();
    assert!(listener.take().is_empty());
}

/// Source that rejects every mutation.
struct ReadOnlySource {
    inner: MapSource,
}

impl FlatSource for ReadOnlySource {
    fn get_property(&self, key: &str) -> Option<ConfigValue> {
        self.inner.get_property(key)
    }

    fn add_property(&mut self, _key: &str, _value: ConfigValue) -> ConfigResult<()> {
        Err(ConfigError::source("source is read-only"))
    }

    fn set_property(&mut self, _key: &str, _value: ConfigValue) -> ConfigResult<()> {
        Err(ConfigError::source("source is read-only"))
    }

    fn clear_property(&mut self, _key: &str) -> ConfigResult<()> {
        Err(ConfigError::source("source is read-only"))
    }

    fn clear(&mut self) -> ConfigResult<()> {
        Err(ConfigError::source("source is read-only"))
    }

    fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

#[test]
fn test_failed_mutation_emits_only_before_event() {
    let mut source = EventedSource::new(Box::new(ReadOnlySource {
        inner: MapSource::new(),
    }));
    let listener = Rc::new(RecordingListener::default());
    source.add_listener(listener.clone());

    let err = source
        .set_property("key", ConfigValue::from(1i64))
        .unwrap_err();
    assert!(err.is_source());

    let events = listener.take();
    assert_eq!(events.len(), 1);
    assert!(events[0].before_update);
    assert_eq!(events[0].kind, EventKind::ModifyProperty);
}

#[test]
fn test_wrapper_preserves_source_behavior() {
    let (mut source, _listener) = wrapped();
    source.add_property("tag", ConfigValue::from("a")).unwrap();
    source.add_property("tag", ConfigValue::from("b")).unwrap();

    assert_eq!(
        source.get_property("tag"),
        Some(ConfigValue::Array(vec![
            ConfigValue::from("a"),
            ConfigValue::from("b")
        ]))
    );
    assert_eq!(source.value_count("tag"), 2);

    source.set_property("db.host", ConfigValue::from("h")).unwrap();
    source.set_property("db.port", ConfigValue::from(1i64)).unwrap();
    assert_eq!(source.keys_with_prefix("db."), vec!["db.host", "db.port"]);
}

#[test]
fn test_capability_passes_through_to_inner_source() {
    #[derive(Debug, PartialEq)]
    struct SnapshotSupport(&'static str);

    let mut inner = MapSource::new();
    inner.register_capability(SnapshotSupport("map"));
    let source = EventedSource::new(Box::new(inner));

    assert_eq!(
        source.get_capability::<SnapshotSupport>().as_deref(),
        Some(&SnapshotSupport("map"))
    );
    assert!(source.get_capability::<u32>().is_none());

    // a bare source without capabilities answers nothing
    let plain = EventedSource::new(Box::new(MapSource::new()));
    assert!(plain.get_capability::<SnapshotSupport>().is_none());
}

#[test]
fn test_distinct_wrappers_have_distinct_source_ids() {
    let (source_a, _) = wrapped();
    let (source_b, _) = wrapped();
    assert_ne!(source_a.source_id(), source_b.source_id());
}
