// Request managers
//
// One manager per event kind, each owning two concurrent indices: natural
// key to request id, and request id to record. The per-kind differences —
// key shape and native create call — are injected as a key type and a
// factory function; everything else is shared.

use crate::arguments::{strip_unique_id, supplied_unique_id, RequestArg};
use crate::connection::{DebuggerConnection, NativeError, NativeModifier, VmState};
use crate::error::{JdiError, JdiResult};
use crate::types::{EventKind, NativeRequestHandle, RequestId, SuspendPolicy};
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
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

pub use breakpoint::{BreakpointKey, BreakpointRequestManager};
pub use class::{ClassPrepareRequestManager, ClassUnloadRequestManager};
pub use exception::{ExceptionKey, ExceptionRequestManager};
pub use method::{MethodEntryRequestManager, MethodExitRequestManager, MethodKey};
pub use monitor::{
    MonitorContendedEnterRequestManager, MonitorContendedEnteredRequestManager,
    MonitorWaitRequestManager, MonitorWaitedRequestManager,
};
pub use step::{StepKey, StepRequestManager};
pub use thread::{ThreadDeathRequestManager, ThreadStartRequestManager};
pub use vm::VmDeathRequestManager;
pub use watchpoint::{
    AccessWatchpointRequestManager, ModificationWatchpointRequestManager, WatchpointKey,
};

/// Natural key of a request. Class-scoped kinds contribute default request
/// arguments (an exact class-inclusion filter) derived from the key.
pub trait RequestKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    fn default_args(&self) -> Vec<RequestArg> {
        Vec::new()
    }
}

/// Natural key for kinds whose requests are distinguished only by their
/// argument set (monitor, class, thread and vm lifecycle kinds). Normalized:
/// the unique-id property never participates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgsKey(Vec<RequestArg>);

impl ArgsKey {
    pub fn from_args(args: &[RequestArg]) -> Self {
        Self(strip_unique_id(args))
    }

    pub fn args(&self) -> &[RequestArg] {
        &self.0
    }
}

impl RequestKey for ArgsKey {}

/// A live request owned by a manager.
#[derive(Debug, Clone)]
pub struct RequestRecord<K> {
    pub id: RequestId,
    pub key: K,
    pub handle: NativeRequestHandle,
    /// Arguments as received at creation, led by the unique-id property.
    pub request_args: Vec<RequestArg>,
}

type CreateFn<K> = Box<
    dyn Fn(&K, SuspendPolicy, &[NativeModifier]) -> Result<NativeRequestHandle, NativeError>
        + Send
        + Sync,
>;

pub struct RequestManager<K: RequestKey> {
    kind: EventKind,
    connection: Arc<dyn DebuggerConnection>,
    vm: Arc<VmState>,
    create_native: CreateFn<K>,
    keys: DashMap<K, RequestId>,
    records: DashMap<RequestId, RequestRecord<K>>,
}

impl<K: RequestKey> RequestManager<K> {
    pub(crate) fn with_factory(
        kind: EventKind,
        connection: Arc<dyn DebuggerConnection>,
        vm: Arc<VmState>,
        create_native: CreateFn<K>,
    ) -> Self {
        Self {
            kind,
            connection,
            vm,
            create_native,
            keys: DashMap::new(),
            records: DashMap::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Create a request under `key`, generating an id unless the caller
    /// supplied a unique-id argument.
    pub fn create_for_key(&self, key: K, args: Vec<RequestArg>) -> JdiResult<RequestId> {
        let id = supplied_unique_id(&args).unwrap_or_else(RequestId::generate);
        self.create_with_id_for_key(id, key, args)
    }

    /// Create a request under `key` with a caller-chosen id. On success the
    /// native request is installed and enabled and both indices are
    /// populated; on failure nothing is written.
    pub fn create_with_id_for_key(
        &self,
        id: RequestId,
        key: K,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        if self.vm.is_terminated() {
            return Err(JdiError::TerminalVm);
        }

        // The stored argument list always leads with this request's id
        let mut request_args = Vec::with_capacity(args.len() + 1);
        request_args.push(RequestArg::UniqueId(id.clone()));
        request_args.extend(
            args.into_iter()
                .filter(|arg| !matches!(arg, RequestArg::UniqueId(_))),
        );

        let suspend = request_args
            .iter()
            .find_map(|arg| match arg {
                RequestArg::SuspendPolicy(policy) => Some(*policy),
                _ => None,
            })
            .unwrap_or(SuspendPolicy::EventThread);
        let enabled = request_args
            .iter()
            .find_map(|arg| match arg {
                RequestArg::Enabled(enabled) => Some(*enabled),
                _ => None,
            })
            .unwrap_or(true);

        let mut modifiers: Vec<NativeModifier> = request_args
            .iter()
            .filter_map(RequestArg::to_modifier)
            .collect();
        modifiers.extend(
            key.default_args()
                .iter()
                .filter_map(RequestArg::to_modifier),
        );

        let handle = (self.create_native)(&key, suspend, &modifiers)
            .map_err(JdiError::NativeCreationFailed)?;
        if enabled {
            if let Err(e) = self.connection.enable_request(handle) {
                // Roll back the native side; indices were never written
                let _ = self.connection.delete_request(handle);
                return Err(JdiError::NativeCreationFailed(e));
            }
        }

        let record = RequestRecord {
            id: id.clone(),
            key: key.clone(),
            handle,
            request_args,
        };
        self.records.insert(id.clone(), record);
        self.keys.insert(key, id.clone());
        debug!(kind = ?self.kind, id = %id, handle, "event request installed");
        Ok(id)
    }

    pub fn has(&self, key: &K) -> bool {
        self.keys.contains_key(key)
    }

    pub fn has_by_id(&self, id: &RequestId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, key: &K) -> Option<NativeRequestHandle> {
        let id = self.keys.get(key).map(|entry| entry.value().clone())?;
        self.get_by_id(&id)
    }

    pub fn get_by_id(&self, id: &RequestId) -> Option<NativeRequestHandle> {
        self.records.get(id).map(|record| record.handle)
    }

    pub fn list(&self) -> Vec<K> {
        self.keys.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn list_ids(&self) -> Vec<RequestId> {
        self.records
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Arguments the request was created with, minus the unique-id property.
    pub fn arguments(&self, id: &RequestId) -> Option<Vec<RequestArg>> {
        self.records
            .get(id)
            .map(|record| strip_unique_id(&record.request_args))
    }

    /// Remove the request indexed under `key`. Returns whether one existed.
    pub fn remove(&self, key: &K) -> bool {
        match self.keys.remove(key) {
            Some((_, id)) => self.remove_record(&id, false),
            None => false,
        }
    }

    /// Remove the request with this id, evicting its key-index entry as
    /// well. Returns whether it existed; duplicate calls return false.
    pub fn remove_by_id(&self, id: &RequestId) -> bool {
        self.remove_record(id, true)
    }

    fn remove_record(&self, id: &RequestId, evict_key: bool) -> bool {
        let Some((_, record)) = self.records.remove(id) else {
            return false;
        };
        if evict_key {
            self.keys.remove_if(&record.key, |_, mapped| mapped == id);
        }
        if let Err(e) = self.connection.delete_request(record.handle) {
            // Already-gone is not an error
            debug!(kind = ?self.kind, id = %id, "native delete failed: {e}");
        }
        debug!(kind = ?self.kind, id = %id, "event request removed");
        true
    }

    /// Whether a live request under `key` has this argument set, modulo the
    /// unique-id property. Drives memoization invalidation.
    pub(crate) fn has_equivalent(&self, key: &K, stripped_args: &[RequestArg]) -> bool {
        self.records.iter().any(|entry| {
            entry.key == *key && strip_unique_id(&entry.request_args) == stripped_args
        })
    }
}

/// Shared create surface for managers keyed by their argument set.
impl RequestManager<ArgsKey> {
    pub fn create(&self, args: Vec<RequestArg>) -> JdiResult<RequestId> {
        let key = ArgsKey::from_args(&args);
        self.create_for_key(key, args)
    }

    pub fn create_with_id(&self, id: RequestId, args: Vec<RequestArg>) -> JdiResult<RequestId> {
        let key = ArgsKey::from_args(&args);
        self.create_with_id_for_key(id, key, args)
    }
}
