// Event model and dispatch
//
// Native events arrive from the debuggee on a single dispatcher thread and
// are fanned out to registered handlers after evaluating event-argument
// filters. Handlers run on the dispatcher thread and must not block.

use crate::arguments::EventArg;
use crate::connection::{DebuggerConnection, NativeError, VmState};
use crate::pipeline::Pipeline;
use crate::types::{EventKind, Location, ObjectId, ThreadId, Value};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmStartEvent {
    pub thread: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmDeathEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmDisconnectEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadStartEvent {
    pub thread: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDeathEvent {
    pub thread: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrepareEvent {
    pub thread: ThreadId,
    pub class_name: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassUnloadEvent {
    pub class_name: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointEvent {
    pub thread: ThreadId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub thread: ThreadId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodEntryEvent {
    pub thread: ThreadId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodExitEvent {
    pub thread: ThreadId,
    pub location: Location,
    pub return_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionEvent {
    pub thread: ThreadId,
    pub location: Location,
    pub exception: ObjectId,
    pub catch_location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorWaitEvent {
    pub thread: ThreadId,
    pub monitor: ObjectId,
    pub location: Location,
    pub timeout_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorWaitedEvent {
    pub thread: ThreadId,
    pub monitor: ObjectId,
    pub location: Location,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorContendedEnterEvent {
    pub thread: ThreadId,
    pub monitor: ObjectId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorContendedEnteredEvent {
    pub thread: ThreadId,
    pub monitor: ObjectId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessWatchpointEvent {
    pub thread: ThreadId,
    pub location: Location,
    pub field_class: String,
    pub field_name: String,
    pub object: Option<ObjectId>,
    pub current_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationWatchpointEvent {
    pub thread: ThreadId,
    pub location: Location,
    pub field_class: String,
    pub field_name: String,
    pub object: Option<ObjectId>,
    pub current_value: Value,
    pub value_to_be: Value,
}

/// Kind-specific event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    VmStart(VmStartEvent),
    VmDeath(VmDeathEvent),
    VmDisconnect(VmDisconnectEvent),
    ThreadStart(ThreadStartEvent),
    ThreadDeath(ThreadDeathEvent),
    ClassPrepare(ClassPrepareEvent),
    ClassUnload(ClassUnloadEvent),
    Breakpoint(BreakpointEvent),
    Step(StepEvent),
    MethodEntry(MethodEntryEvent),
    MethodExit(MethodExitEvent),
    Exception(ExceptionEvent),
    MonitorWait(MonitorWaitEvent),
    MonitorWaited(MonitorWaitedEvent),
    MonitorContendedEnter(MonitorContendedEnterEvent),
    MonitorContendedEntered(MonitorContendedEnteredEvent),
    AccessWatchpoint(AccessWatchpointEvent),
    ModificationWatchpoint(ModificationWatchpointEvent),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::VmStart(_) => EventKind::VmStart,
            EventPayload::VmDeath(_) => EventKind::VmDeath,
            EventPayload::VmDisconnect(_) => EventKind::VmDisconnect,
            EventPayload::ThreadStart(_) => EventKind::ThreadStart,
            EventPayload::ThreadDeath(_) => EventKind::ThreadDeath,
            EventPayload::ClassPrepare(_) => EventKind::ClassPrepare,
            EventPayload::ClassUnload(_) => EventKind::ClassUnload,
            EventPayload::Breakpoint(_) => EventKind::Breakpoint,
            EventPayload::Step(_) => EventKind::Step,
            EventPayload::MethodEntry(_) => EventKind::MethodEntry,
            EventPayload::MethodExit(_) => EventKind::MethodExit,
            EventPayload::Exception(_) => EventKind::Exception,
            EventPayload::MonitorWait(_) => EventKind::MonitorWait,
            EventPayload::MonitorWaited(_) => EventKind::MonitorWaited,
            EventPayload::MonitorContendedEnter(_) => EventKind::MonitorContendedEnter,
            EventPayload::MonitorContendedEntered(_) => EventKind::MonitorContendedEntered,
            EventPayload::AccessWatchpoint(_) => EventKind::AccessWatchpoint,
            EventPayload::ModificationWatchpoint(_) => EventKind::ModificationWatchpoint,
        }
    }

    pub fn thread(&self) -> Option<ThreadId> {
        match self {
            EventPayload::VmStart(e) => Some(e.thread),
            EventPayload::ThreadStart(e) => Some(e.thread),
            EventPayload::ThreadDeath(e) => Some(e.thread),
            EventPayload::ClassPrepare(e) => Some(e.thread),
            EventPayload::Breakpoint(e) => Some(e.thread),
            EventPayload::Step(e) => Some(e.thread),
            EventPayload::MethodEntry(e) => Some(e.thread),
            EventPayload::MethodExit(e) => Some(e.thread),
            EventPayload::Exception(e) => Some(e.thread),
            EventPayload::MonitorWait(e) => Some(e.thread),
            EventPayload::MonitorWaited(e) => Some(e.thread),
            EventPayload::MonitorContendedEnter(e) => Some(e.thread),
            EventPayload::MonitorContendedEntered(e) => Some(e.thread),
            EventPayload::AccessWatchpoint(e) => Some(e.thread),
            EventPayload::ModificationWatchpoint(e) => Some(e.thread),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            EventPayload::Breakpoint(e) => Some(&e.location),
            EventPayload::Step(e) => Some(&e.location),
            EventPayload::MethodEntry(e) => Some(&e.location),
            EventPayload::MethodExit(e) => Some(&e.location),
            EventPayload::Exception(e) => Some(&e.location),
            EventPayload::MonitorWait(e) => Some(&e.location),
            EventPayload::MonitorWaited(e) => Some(&e.location),
            EventPayload::MonitorContendedEnter(e) => Some(&e.location),
            EventPayload::MonitorContendedEntered(e) => Some(&e.location),
            EventPayload::AccessWatchpoint(e) => Some(&e.location),
            EventPayload::ModificationWatchpoint(e) => Some(&e.location),
            _ => None,
        }
    }

    fn class_name(&self) -> Option<&str> {
        match self {
            EventPayload::ClassPrepare(e) => Some(&e.class_name),
            EventPayload::ClassUnload(e) => Some(&e.class_name),
            _ => None,
        }
    }

    /// Tag of an unrecognized value carried in the payload, if any.
    fn unknown_value_tag(&self) -> Option<u8> {
        let check = |value: &Value| match value {
            Value::Unknown(tag) => Some(*tag),
            _ => None,
        };
        match self {
            EventPayload::MethodExit(e) => check(&e.return_value),
            EventPayload::AccessWatchpoint(e) => check(&e.current_value),
            EventPayload::ModificationWatchpoint(e) => {
                check(&e.current_value).or_else(|| check(&e.value_to_be))
            }
            _ => None,
        }
    }
}

/// Raw event as delivered by the low-level connection: the kind-specific
/// payload plus the property list echoed from the originating request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeEvent {
    pub request_properties: Vec<(String, String)>,
    pub payload: EventPayload,
}

impl NativeEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            request_properties: Vec::new(),
            payload,
        }
    }

    pub fn with_properties(payload: EventPayload, properties: Vec<(String, String)>) -> Self {
        Self {
            request_properties: properties,
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.request_properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn thread(&self) -> Option<ThreadId> {
        self.payload.thread()
    }

    pub fn location(&self) -> Option<&Location> {
        self.payload.location()
    }

    /// Declaring-type name used by class inclusion/exclusion filters: the
    /// location's declaring type, or the class named by prepare/unload.
    pub fn declaring_type_name(&self) -> Option<&str> {
        self.payload
            .location()
            .map(|location| location.declaring_type.as_str())
            .or_else(|| self.payload.class_name())
    }
}

/// One value extracted by an event argument that opted into extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxDatum {
    pub origin: String,
    pub value: String,
}

/// Ordered extraction results, in event-argument order.
pub type AuxData = Vec<AuxDatum>;

#[derive(Clone)]
struct HandlerEntry {
    kind: EventKind,
    filters: Arc<Vec<EventArg>>,
    sink: Pipeline<(NativeEvent, AuxData)>,
}

struct EventManagerInner {
    handlers: DashMap<u64, HandlerEntry>,
    next_handler_id: AtomicU64,
    vm: Arc<VmState>,
}

/// Dispatches raw native events to registered handlers after applying
/// event-argument filters. Single-writer: `dispatch` runs on the dispatcher
/// thread only, while streams may be added and closed from any thread.
#[derive(Clone)]
pub struct EventManager {
    inner: Arc<EventManagerInner>,
}

impl EventManager {
    pub fn new(vm: Arc<VmState>) -> Self {
        Self {
            inner: Arc::new(EventManagerInner {
                handlers: DashMap::new(),
                next_handler_id: AtomicU64::new(1),
                vm,
            }),
        }
    }

    /// Register a handler for `kind` and return the pipeline it feeds.
    /// Closing the pipeline unregisters the handler.
    pub fn add_event_data_stream(
        &self,
        kind: EventKind,
        filters: Vec<EventArg>,
    ) -> Pipeline<(NativeEvent, AuxData)> {
        let sink = Pipeline::new();
        let id = self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.insert(
            id,
            HandlerEntry {
                kind,
                filters: Arc::new(filters),
                sink: sink.clone(),
            },
        );
        let registry = Arc::downgrade(&self.inner);
        sink.on_close(move || {
            if let Some(inner) = Weak::upgrade(&registry) {
                inner.handlers.remove(&id);
                debug!(handler = id, "event stream closed, handler removed");
            }
        });
        debug!(handler = id, ?kind, "event stream registered");
        sink
    }

    /// Dispatch one native event to every matching handler. Runs on the
    /// dispatcher thread; a panicking handler is logged and skipped.
    pub fn dispatch(&self, event: NativeEvent) {
        let kind = event.kind();
        if let Some(tag) = event.payload.unknown_value_tag() {
            warn!(?kind, tag, "dropping event carrying unknown value tag");
            return;
        }
        trace!(?kind, "dispatching event");

        // Snapshot so handlers may unregister themselves mid-dispatch
        let matching: Vec<HandlerEntry> = self
            .inner
            .handlers
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.value().clone())
            .collect();

        for entry in matching {
            if !entry.filters.iter().all(|filter| filter.accepts(&event)) {
                continue;
            }
            let aux: AuxData = entry
                .filters
                .iter()
                .filter_map(|filter| filter.extract(&event))
                .map(|(origin, value)| AuxDatum { origin, value })
                .collect();
            let sink = entry.sink;
            let item = (event.clone(), aux);
            if panic::catch_unwind(AssertUnwindSafe(|| sink.push(item))).is_err() {
                error!(?kind, "event handler panicked; dispatch continues");
            }
        }

        if kind.is_terminal() {
            self.inner.vm.mark_terminated();
            self.close_all();
        }
    }

    /// Close every registered stream. Used on terminal events and shutdown.
    pub fn close_all(&self) {
        let entries: Vec<HandlerEntry> = self
            .inner
            .handlers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        if !entries.is_empty() {
            info!(streams = entries.len(), "closing all event streams");
        }
        for entry in entries {
            entry.sink.close();
        }
        self.inner.handlers.clear();
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }
}

/// How long one event-queue poll blocks before the loop re-checks its stop
/// flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Dedicated thread draining the native event queue into an `EventManager`.
pub struct EventDispatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventDispatcher {
    /// Stop the loop and join the thread. Safe to call more than once.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn spawn_dispatcher(
    connection: Arc<dyn DebuggerConnection>,
    manager: EventManager,
) -> EventDispatcher {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let handle = thread::spawn(move || {
        info!("event dispatcher started");
        loop {
            if stop_flag.load(Ordering::Acquire) {
                break;
            }
            match connection.poll_events(POLL_INTERVAL) {
                Ok(events) => {
                    for event in events {
                        let terminal = event.kind().is_terminal();
                        manager.dispatch(event);
                        if terminal {
                            info!("terminal event observed, dispatcher exiting");
                            return;
                        }
                    }
                }
                Err(NativeError::ConnectionClosed) => {
                    warn!("event queue closed, treating as disconnect");
                    manager.dispatch(NativeEvent::new(EventPayload::VmDisconnect(
                        VmDisconnectEvent,
                    )));
                    return;
                }
                Err(e) => {
                    warn!("event poll failed: {e}");
                }
            }
        }
        info!("event dispatcher stopped");
    });
    EventDispatcher {
        stop,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;

    fn method_entry(method: &str) -> NativeEvent {
        NativeEvent::new(EventPayload::MethodEntry(MethodEntryEvent {
            thread: 1,
            location: Location {
                declaring_type: "com.example.Main".to_owned(),
                method_name: method.to_owned(),
                source_name: "Main.java".to_owned(),
                line_number: 1,
                code_index: 0,
            },
        }))
    }

    fn manager() -> EventManager {
        EventManager::new(Arc::new(VmState::new()))
    }

    #[test]
    fn test_dispatch_routes_by_kind_and_filters() {
        let events = manager();
        let entries = events.add_event_data_stream(
            EventKind::MethodEntry,
            vec![EventArg::MethodName("run".to_owned())],
        );
        let rx = entries.channel();

        events.dispatch(method_entry("run"));
        events.dispatch(method_entry("other"));
        events.dispatch(NativeEvent::new(EventPayload::ThreadStart(
            ThreadStartEvent { thread: 4 },
        )));

        let (event, aux) = rx.try_recv().unwrap();
        assert_eq!(event.kind(), EventKind::MethodEntry);
        assert!(aux.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unique_id_filter_separates_streams() {
        let events = manager();
        let id_a = RequestId::generate();
        let id_b = RequestId::generate();
        let rx_a = events
            .add_event_data_stream(EventKind::MethodEntry, vec![id_a.as_filter()])
            .channel();
        let rx_b = events
            .add_event_data_stream(EventKind::MethodEntry, vec![id_b.as_filter()])
            .channel();

        let mut event = method_entry("run");
        event.request_properties.push((
            crate::arguments::UNIQUE_ID_PROPERTY.to_owned(),
            id_a.as_str().to_owned(),
        ));
        events.dispatch(event);

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_closing_stream_removes_handler() {
        let events = manager();
        let stream = events.add_event_data_stream(EventKind::Breakpoint, vec![]);
        assert_eq!(events.handler_count(), 1);

        stream.close();
        assert_eq!(events.handler_count(), 0);
    }

    #[test]
    fn test_terminal_event_closes_everything() {
        let events = manager();
        let rx = events
            .add_event_data_stream(EventKind::MethodEntry, vec![])
            .channel();
        let terminal_rx = events
            .add_event_data_stream(EventKind::VmDeath, vec![])
            .channel();

        events.dispatch(NativeEvent::new(EventPayload::VmDeath(VmDeathEvent)));

        // The terminal event itself is delivered before teardown
        assert!(terminal_rx.try_recv().is_ok());
        assert!(rx.recv().is_err());
        assert_eq!(events.handler_count(), 0);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let events = manager();
        events
            .add_event_data_stream(EventKind::MethodEntry, vec![])
            .for_each(|_| panic!("misbehaving subscriber"));
        let rx = events
            .add_event_data_stream(EventKind::MethodEntry, vec![])
            .channel();

        events.dispatch(method_entry("run"));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_unknown_value_payload_is_dropped() {
        let events = manager();
        let rx = events
            .add_event_data_stream(EventKind::MethodExit, vec![])
            .channel();

        events.dispatch(NativeEvent::new(EventPayload::MethodExit(MethodExitEvent {
            thread: 1,
            location: method_entry("run").location().unwrap().clone(),
            return_value: Value::Unknown(0x7f),
        })));
        assert!(rx.try_recv().is_err());

        events.dispatch(NativeEvent::new(EventPayload::MethodExit(MethodExitEvent {
            thread: 1,
            location: method_entry("run").location().unwrap().clone(),
            return_value: Value::Int(3),
        })));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_aux_data_extraction_order() {
        let events = manager();
        let first = crate::arguments::CustomFilter::new("first", |_| true)
            .with_extractor(|event| event.thread().map(|t| t.to_string()));
        let second = crate::arguments::CustomFilter::new("second", |_| true)
            .with_extractor(|event| {
                event.location().map(|l| l.method_name.clone())
            });
        let rx = events
            .add_event_data_stream(
                EventKind::MethodEntry,
                vec![EventArg::Custom(first), EventArg::Custom(second)],
            )
            .channel();

        events.dispatch(method_entry("run"));
        let (_, aux) = rx.try_recv().unwrap();
        assert_eq!(aux.len(), 2);
        assert_eq!(aux[0].origin, "first");
        assert_eq!(aux[0].value, "1");
        assert_eq!(aux[1].origin, "second");
        assert_eq!(aux[1].value, "run");
    }
}
