// Deterministic, in-memory test double for the low-level connection.
//
// Captures every created request with its modifiers, lets tests inject
// events (optionally stamped with a request's properties), force creation
// failures, and simulate a disconnect.

use crate::connection::{DebuggerConnection, NativeError, NativeModifier, VmState};
use crate::events::{EventPayload, NativeEvent, VmDisconnectEvent};
use crate::types::{
    EventKind, NativeRequestHandle, StepDepth, StepSize, SuspendPolicy, ThreadId,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A request installed into the mock debuggee.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub handle: NativeRequestHandle,
    pub kind: EventKind,
    /// Natural-key fields as a display string, e.g. `Main.java:3`.
    pub target: String,
    pub suspend: SuspendPolicy,
    pub modifiers: Vec<NativeModifier>,
    pub enabled: bool,
    pub deleted: bool,
}

struct MockInner {
    next_handle: AtomicI32,
    requests: DashMap<NativeRequestHandle, MockRequest>,
    create_counts: DashMap<EventKind, usize>,
    fail_next_create: AtomicBool,
    events_tx: Sender<NativeEvent>,
    events_rx: Receiver<NativeEvent>,
}

#[derive(Clone)]
pub struct MockConnection {
    inner: Arc<MockInner>,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnection {
    pub fn new() -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            inner: Arc::new(MockInner {
                next_handle: AtomicI32::new(1),
                requests: DashMap::new(),
                create_counts: DashMap::new(),
                fail_next_create: AtomicBool::new(false),
                events_tx,
                events_rx,
            }),
        }
    }

    /// Convenience pairing: a connection plus a fresh liveness flag.
    pub fn with_vm_state() -> (Self, Arc<VmState>) {
        (Self::new(), Arc::new(VmState::new()))
    }

    /// The next create call fails with `InvalidArguments`.
    pub fn fail_next_create(&self) {
        self.inner.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Inject an event with no request properties.
    pub fn emit(&self, payload: EventPayload) {
        let _ = self.inner.events_tx.send(NativeEvent::new(payload));
    }

    /// Inject an event stamped with the given request's properties, the way
    /// the debuggee echoes them on real events.
    pub fn emit_for(&self, handle: NativeRequestHandle, payload: EventPayload) {
        let properties = self
            .inner
            .requests
            .get(&handle)
            .map(|request| {
                request
                    .modifiers
                    .iter()
                    .filter_map(|modifier| match modifier {
                        NativeModifier::Property { key, value } => {
                            Some((key.clone(), value.clone()))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let _ = self
            .inner
            .events_tx
            .send(NativeEvent::with_properties(payload, properties));
    }

    pub fn emit_raw(&self, event: NativeEvent) {
        let _ = self.inner.events_tx.send(event);
    }

    /// Simulate the debuggee going away.
    pub fn disconnect(&self) {
        self.emit(EventPayload::VmDisconnect(VmDisconnectEvent));
    }

    /// How many create calls were attempted for this kind, failures included.
    pub fn created(&self, kind: EventKind) -> usize {
        self.inner
            .create_counts
            .get(&kind)
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Requests of this kind that have not been deleted.
    pub fn live_requests(&self, kind: EventKind) -> Vec<MockRequest> {
        self.inner
            .requests
            .iter()
            .filter(|entry| entry.kind == kind && !entry.deleted)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn request(&self, handle: NativeRequestHandle) -> Option<MockRequest> {
        self.inner
            .requests
            .get(&handle)
            .map(|entry| entry.value().clone())
    }

    fn install(
        &self,
        kind: EventKind,
        target: String,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        *self.inner.create_counts.entry(kind).or_insert(0) += 1;
        if self.inner.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(NativeError::InvalidArguments(
                "injected create failure".to_owned(),
            ));
        }
        let handle = self.inner.next_handle.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.insert(
            handle,
            MockRequest {
                handle,
                kind,
                target,
                suspend,
                modifiers: modifiers.to_vec(),
                enabled: false,
                deleted: false,
            },
        );
        Ok(handle)
    }
}

impl DebuggerConnection for MockConnection {
    fn create_breakpoint_request(
        &self,
        source_name: &str,
        line_number: u32,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(
            EventKind::Breakpoint,
            format!("{source_name}:{line_number}"),
            suspend,
            modifiers,
        )
    }

    fn create_method_entry_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::MethodEntry, String::new(), suspend, modifiers)
    }

    fn create_method_exit_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::MethodExit, String::new(), suspend, modifiers)
    }

    fn create_monitor_wait_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::MonitorWait, String::new(), suspend, modifiers)
    }

    fn create_monitor_waited_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::MonitorWaited, String::new(), suspend, modifiers)
    }

    fn create_monitor_contended_enter_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(
            EventKind::MonitorContendedEnter,
            String::new(),
            suspend,
            modifiers,
        )
    }

    fn create_monitor_contended_entered_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(
            EventKind::MonitorContendedEntered,
            String::new(),
            suspend,
            modifiers,
        )
    }

    fn create_class_prepare_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::ClassPrepare, String::new(), suspend, modifiers)
    }

    fn create_class_unload_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::ClassUnload, String::new(), suspend, modifiers)
    }

    fn create_thread_start_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::ThreadStart, String::new(), suspend, modifiers)
    }

    fn create_thread_death_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::ThreadDeath, String::new(), suspend, modifiers)
    }

    fn create_exception_request(
        &self,
        exception_class: Option<&str>,
        notify_caught: bool,
        notify_uncaught: bool,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(
            EventKind::Exception,
            format!(
                "{} caught={notify_caught} uncaught={notify_uncaught}",
                exception_class.unwrap_or("*")
            ),
            suspend,
            modifiers,
        )
    }

    fn create_access_watchpoint_request(
        &self,
        class_name: &str,
        field_name: &str,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(
            EventKind::AccessWatchpoint,
            format!("{class_name}.{field_name}"),
            suspend,
            modifiers,
        )
    }

    fn create_modification_watchpoint_request(
        &self,
        class_name: &str,
        field_name: &str,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(
            EventKind::ModificationWatchpoint,
            format!("{class_name}.{field_name}"),
            suspend,
            modifiers,
        )
    }

    fn create_step_request(
        &self,
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(
            EventKind::Step,
            format!("thread={thread} {size:?}/{depth:?}"),
            suspend,
            modifiers,
        )
    }

    fn create_vm_death_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError> {
        self.install(EventKind::VmDeath, String::new(), suspend, modifiers)
    }

    fn enable_request(&self, handle: NativeRequestHandle) -> Result<(), NativeError> {
        match self.inner.requests.get_mut(&handle) {
            Some(mut request) if !request.deleted => {
                request.enabled = true;
                Ok(())
            }
            _ => Err(NativeError::UnknownRequest(handle)),
        }
    }

    fn delete_request(&self, handle: NativeRequestHandle) -> Result<(), NativeError> {
        if let Some(mut request) = self.inner.requests.get_mut(&handle) {
            request.deleted = true;
            request.enabled = false;
        }
        Ok(())
    }

    fn poll_events(&self, timeout: Duration) -> Result<Vec<NativeEvent>, NativeError> {
        match self.inner.events_rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut batch = vec![first];
                while let Ok(event) = self.inner.events_rx.try_recv() {
                    batch.push(event);
                }
                Ok(batch)
            }
            Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => Err(NativeError::ConnectionClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::UNIQUE_ID_PROPERTY;
    use crate::events::{BreakpointEvent, EventPayload};
    use crate::types::Location;

    #[test]
    fn test_emit_for_echoes_request_properties() {
        let mock = MockConnection::new();
        let handle = mock
            .create_breakpoint_request(
                "Main.java",
                3,
                SuspendPolicy::EventThread,
                &[NativeModifier::Property {
                    key: UNIQUE_ID_PROPERTY.to_owned(),
                    value: "abc".to_owned(),
                }],
            )
            .unwrap();

        mock.emit_for(
            handle,
            EventPayload::Breakpoint(BreakpointEvent {
                thread: 1,
                location: Location {
                    declaring_type: "Main".to_owned(),
                    method_name: "main".to_owned(),
                    source_name: "Main.java".to_owned(),
                    line_number: 3,
                    code_index: 0,
                },
            }),
        );

        let events = mock.poll_events(Duration::from_millis(10)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].property(UNIQUE_ID_PROPERTY), Some("abc"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mock = MockConnection::new();
        let handle = mock
            .create_vm_death_request(SuspendPolicy::None, &[])
            .unwrap();
        assert!(mock.delete_request(handle).is_ok());
        assert!(mock.delete_request(handle).is_ok());
        assert!(mock.delete_request(9999).is_ok());
        assert!(mock.live_requests(EventKind::VmDeath).is_empty());
    }
}
