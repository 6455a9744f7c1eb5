// Profiles
//
// Per-event-kind facades over the managers, the memoization cells and the
// event manager. The uniform subscribe protocol: partition the caller's
// arguments, memoize-create the request (stamping a fresh unique id), open a
// filtered event stream led by the twin unique-id filter, bump the
// subscriber counter, and hook teardown into pipeline close.
//
// Collaborators are injected at construction; tests swap in mocks by
// configuration, not subclassing.

use crate::arguments::{partition, strip_unique_id, supplied_unique_id, Argument, EventArg, RequestArg};
use crate::error::JdiResult;
use crate::events::{AuxData, EventManager, NativeEvent};
use crate::memo::MemoCell;
use crate::pipeline::Pipeline;
use crate::requests::{ArgsKey, RequestKey, RequestManager};
use crate::types::{EventKind, RequestId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub mod breakpoint;
pub mod class;
pub mod exception;
pub mod method;
pub mod monitor;
pub mod step;
pub mod thread;
pub mod vm;
pub mod watchpoint;

pub use breakpoint::BreakpointProfile;
pub use class::{ClassPrepareProfile, ClassUnloadProfile};
pub use exception::ExceptionProfile;
pub use method::{MethodEntryProfile, MethodExitProfile};
pub use monitor::{
    MonitorContendedEnterProfile, MonitorContendedEnteredProfile, MonitorWaitProfile,
    MonitorWaitedProfile,
};
pub use step::StepProfile;
pub use thread::{ThreadDeathProfile, ThreadStartProfile};
pub use vm::{VmDeathProfile, VmDisconnectProfile, VmStartProfile};
pub use watchpoint::{AccessWatchpointProfile, ModificationWatchpointProfile};

/// Subscriber key: the request id plus the identities of the event-argument
/// sequence the pipeline was opened with (the unique-id filter included).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    request: RequestId,
    filters: Vec<String>,
}

/// Reference counts of open subscriber pipelines, per subscriber key. A
/// count reaching zero removes the counter entry; the request itself is only
/// torn down once no other live counter references its id.
#[derive(Clone)]
pub(crate) struct SubscriberCounters {
    counters: Arc<DashMap<CounterKey, Arc<AtomicUsize>>>,
}

impl SubscriberCounters {
    fn new() -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
        }
    }

    fn acquire(&self, key: CounterKey) {
        self.counters
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
            .fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the counter for `key`. Returns true when this was the last
    /// subscriber referencing the key's request id.
    fn release(&self, key: &CounterKey) -> bool {
        let Some(counter) = self
            .counters
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return false;
        };
        if counter.fetch_sub(1, Ordering::SeqCst) != 1 {
            return false;
        }
        self.counters
            .remove_if(key, |_, counter| counter.load(Ordering::SeqCst) == 0);
        // Another subscriber may still share the request under a different
        // event-argument sequence
        !self
            .counters
            .iter()
            .any(|entry| entry.key().request == key.request)
    }

    pub(crate) fn len(&self) -> usize {
        self.counters.len()
    }
}

/// Open the subscriber-facing stream for an installed request: unique-id
/// filter first, then the caller's event arguments; counter bookkeeping and
/// request teardown ride on pipeline close.
fn open_data_pipeline<E: Clone + Send + Sync + 'static>(
    events: &EventManager,
    counters: &SubscriberCounters,
    kind: EventKind,
    request_id: RequestId,
    event_args: Vec<EventArg>,
    remove: Arc<dyn Fn(&RequestId) + Send + Sync>,
    project: fn(&NativeEvent) -> Option<E>,
) -> Pipeline<(E, AuxData)> {
    let mut filters = Vec::with_capacity(event_args.len() + 1);
    filters.push(request_id.as_filter());
    filters.extend(event_args);

    let key = CounterKey {
        request: request_id.clone(),
        filters: filters.iter().map(EventArg::identity).collect(),
    };
    counters.acquire(key.clone());

    let stream = events.add_event_data_stream(kind, filters);
    let typed = stream.filter_map(move |(event, aux): &(NativeEvent, AuxData)| {
        project(event).map(|typed| (typed, aux.clone()))
    });

    let counters = counters.clone();
    let teardown = Pipeline::<()>::new();
    teardown.on_close(move || {
        if counters.release(&key) {
            debug!(id = %request_id, "last subscriber gone, removing request");
            remove(&request_id);
        }
    });
    typed.union_output(&teardown)
}

/// Stream for the request-less kinds (vm-start, vm-disconnect): no request,
/// no counter, just a filtered projection of the raw stream.
fn open_plain_pipeline<E: Clone + Send + Sync + 'static>(
    events: &EventManager,
    kind: EventKind,
    event_args: Vec<EventArg>,
    project: fn(&NativeEvent) -> Option<E>,
) -> Pipeline<(E, AuxData)> {
    events
        .add_event_data_stream(kind, event_args)
        .filter_map(move |(event, aux): &(NativeEvent, AuxData)| {
            project(event).map(|typed| (typed, aux.clone()))
        })
}

/// Shared implementation of the subscribe protocol, parameterized by the
/// kind's natural-key schema and its typed-event projection.
pub(crate) struct ProfileCore<K: RequestKey, E> {
    kind: EventKind,
    manager: Arc<RequestManager<K>>,
    events: EventManager,
    cache: MemoCell<(K, Vec<RequestArg>), (K, Vec<RequestArg>), RequestId>,
    counters: SubscriberCounters,
    project: fn(&NativeEvent) -> Option<E>,
}

impl<K: RequestKey, E: Clone + Send + Sync + 'static> ProfileCore<K, E> {
    pub(crate) fn new(
        kind: EventKind,
        manager: Arc<RequestManager<K>>,
        events: EventManager,
        project: fn(&NativeEvent) -> Option<E>,
    ) -> Self {
        let create_manager = Arc::clone(&manager);
        let check_manager = Arc::clone(&manager);
        let cache = MemoCell::new(
            Box::new(|(key, args): &(K, Vec<RequestArg>)| {
                (key.clone(), strip_unique_id(args))
            }),
            Box::new(move |(key, args): &(K, Vec<RequestArg>)| {
                let id = supplied_unique_id(args).unwrap_or_else(RequestId::generate);
                create_manager.create_with_id_for_key(id, key.clone(), args.clone())
            }),
            Box::new(move |(key, stripped): &(K, Vec<RequestArg>)| {
                !check_manager.has_equivalent(key, stripped)
            }),
        );
        Self {
            kind,
            manager,
            events,
            cache,
            counters: SubscriberCounters::new(),
            project,
        }
    }

    /// Subscribe under an explicit natural key. `lead_filters` are event
    /// arguments the profile itself contributes (e.g. the method-name
    /// filter); they precede the caller's.
    pub(crate) fn subscribe(
        &self,
        key: K,
        extra: Vec<Argument>,
        lead_filters: Vec<EventArg>,
    ) -> JdiResult<Pipeline<(E, AuxData)>> {
        let (mut request_args, event_args, other) = partition(extra);
        request_args.extend(other.into_iter().map(RequestArg::Native));
        let id = self.cache.lookup(&(key, request_args))?;

        let mut filters = lead_filters;
        filters.extend(event_args);
        let manager = Arc::clone(&self.manager);
        Ok(open_data_pipeline(
            &self.events,
            &self.counters,
            self.kind,
            id,
            filters,
            Arc::new(move |request_id: &RequestId| {
                manager.remove_by_id(request_id);
            }),
            self.project,
        ))
    }

    pub(crate) fn manager(&self) -> &Arc<RequestManager<K>> {
        &self.manager
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.counters.len()
    }
}

impl<E: Clone + Send + Sync + 'static> ProfileCore<ArgsKey, E> {
    /// Subscribe for an argument-set keyed kind: the natural key is the
    /// normalized request-argument set itself.
    pub(crate) fn subscribe_by_args(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(E, AuxData)>> {
        let (mut request_args, event_args, other) = partition(extra);
        request_args.extend(other.into_iter().map(RequestArg::Native));
        let key = ArgsKey::from_args(&request_args);
        let id = self.cache.lookup(&(key, request_args))?;

        let manager = Arc::clone(&self.manager);
        Ok(open_data_pipeline(
            &self.events,
            &self.counters,
            self.kind,
            id,
            event_args,
            Arc::new(move |request_id: &RequestId| {
                manager.remove_by_id(request_id);
            }),
            self.project,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{DebuggerConnection, VmState};
    use crate::events::{EventPayload, MonitorWaitEvent};
    use crate::mock::MockConnection;
    use crate::requests::MonitorWaitRequestManager;
    use crate::types::Location;

    fn project(event: &NativeEvent) -> Option<MonitorWaitEvent> {
        match &event.payload {
            EventPayload::MonitorWait(e) => Some(e.clone()),
            _ => None,
        }
    }

    fn wait_event() -> EventPayload {
        EventPayload::MonitorWait(MonitorWaitEvent {
            thread: 1,
            monitor: 0x10,
            location: Location {
                declaring_type: "com.example.Main".to_owned(),
                method_name: "run".to_owned(),
                source_name: "Main.java".to_owned(),
                line_number: 5,
                code_index: 0,
            },
            timeout_ms: 0,
        })
    }

    fn core() -> (ProfileCore<ArgsKey, MonitorWaitEvent>, MockConnection, EventManager) {
        let (mock, vm) = MockConnection::with_vm_state();
        let events = EventManager::new(vm.clone());
        let manager = Arc::new(MonitorWaitRequestManager::new_monitor_wait(
            Arc::new(mock.clone()),
            vm,
        ));
        (
            ProfileCore::new(EventKind::MonitorWait, manager, events.clone(), project),
            mock,
            events,
        )
    }

    #[test]
    fn test_subscribers_share_one_request() {
        let (core, mock, _events) = core();

        let first = core.subscribe_by_args(vec![]).unwrap();
        let second = core.subscribe_by_args(vec![]).unwrap();
        assert_eq!(mock.created(EventKind::MonitorWait), 1);
        assert_eq!(core.subscription_count(), 1);

        first.close();
        assert_eq!(mock.live_requests(EventKind::MonitorWait).len(), 1);
        second.close();
        assert!(mock.live_requests(EventKind::MonitorWait).is_empty());
        assert_eq!(core.subscription_count(), 0);
    }

    #[test]
    fn test_close_is_idempotent_per_subscriber() {
        let (core, mock, _events) = core();
        let first = core.subscribe_by_args(vec![]).unwrap();
        let _second = core.subscribe_by_args(vec![]).unwrap();

        first.close();
        first.close();
        first.close();
        // The second subscriber still holds the request
        assert_eq!(mock.live_requests(EventKind::MonitorWait).len(), 1);
    }

    #[test]
    fn test_out_of_band_removal_invalidates_the_cache() {
        let (core, mock, _events) = core();
        let pipeline = core.subscribe_by_args(vec![]).unwrap();
        let old_id = core.manager().list_ids()[0].clone();

        assert!(core.manager().remove_by_id(&old_id));
        pipeline.close();

        let _fresh = core.subscribe_by_args(vec![]).unwrap();
        let new_id = core.manager().list_ids()[0].clone();
        assert_ne!(old_id, new_id);
        assert_eq!(mock.created(EventKind::MonitorWait), 2);
    }

    #[test]
    fn test_events_are_correlated_by_unique_id() {
        let (core, mock, events) = core();
        let rx_a = core
            .subscribe_by_args(vec![RequestArg::Count(5).into()])
            .unwrap()
            .channel();
        let rx_b = core
            .subscribe_by_args(vec![RequestArg::Count(10).into()])
            .unwrap()
            .channel();
        assert_eq!(mock.created(EventKind::MonitorWait), 2);

        let handle_a = mock
            .live_requests(EventKind::MonitorWait)
            .iter()
            .find(|request| {
                request
                    .modifiers
                    .contains(&crate::connection::NativeModifier::Count(5))
            })
            .unwrap()
            .handle;
        mock.emit_for(handle_a, wait_event());
        let event = mock
            .poll_events(std::time::Duration::from_millis(10))
            .unwrap()
            .remove(0);
        events.dispatch(event);

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_different_event_args_do_not_steal_teardown() {
        let (core, mock, _events) = core();
        let plain = core.subscribe_by_args(vec![]).unwrap();
        let filtered = core
            .subscribe_by_args(vec![EventArg::MethodName("run".to_owned()).into()])
            .unwrap();
        assert_eq!(mock.created(EventKind::MonitorWait), 1);
        assert_eq!(core.subscription_count(), 2);

        filtered.close();
        // The request survives: another counter still references its id
        assert_eq!(mock.live_requests(EventKind::MonitorWait).len(), 1);
        plain.close();
        assert!(mock.live_requests(EventKind::MonitorWait).is_empty());
    }
}
