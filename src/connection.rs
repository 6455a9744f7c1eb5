// Low-level debugger connection interface
//
// The transport to the debuggee lives outside this crate; everything here is
// the contract the pipeline subsystem consumes: per-kind request creation,
// enable/delete, and the native event queue poll. `MockConnection` in the
// `mock` module is the in-memory implementation used by tests.

use crate::events::NativeEvent;
use crate::types::{
    NativeRequestHandle, ObjectId, StepDepth, StepSize, SuspendPolicy, ThreadId,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Modifier installed on a native request at creation time. Unknown user
/// extensions travel through this representation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeModifier {
    Count(i32),
    ThreadOnly(ThreadId),
    ClassMatch(String),
    ClassExclude(String),
    InstanceOnly(ObjectId),
    /// Opaque key/value property attached to the request and echoed on every
    /// event it produces. Values must round-trip byte-for-byte.
    Property { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum NativeError {
    #[error("invalid request arguments: {0}")]
    InvalidArguments(String),

    #[error("debuggee VM is dead")]
    VmDead,

    #[error("request {0} does not exist")]
    UnknownRequest(NativeRequestHandle),

    #[error("connection closed")]
    ConnectionClosed,
}

/// The low-level debugger connection consumed by the request managers and the
/// event dispatcher. One method per creatable event kind, mirroring the
/// request surface a JDI virtual machine exposes.
pub trait DebuggerConnection: Send + Sync {
    fn create_breakpoint_request(
        &self,
        source_name: &str,
        line_number: u32,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_method_entry_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_method_exit_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_monitor_wait_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_monitor_waited_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_monitor_contended_enter_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_monitor_contended_entered_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_class_prepare_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_class_unload_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_thread_start_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_thread_death_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_exception_request(
        &self,
        exception_class: Option<&str>,
        notify_caught: bool,
        notify_uncaught: bool,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_access_watchpoint_request(
        &self,
        class_name: &str,
        field_name: &str,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_modification_watchpoint_request(
        &self,
        class_name: &str,
        field_name: &str,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_step_request(
        &self,
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn create_vm_death_request(
        &self,
        suspend: SuspendPolicy,
        modifiers: &[NativeModifier],
    ) -> Result<NativeRequestHandle, NativeError>;

    fn enable_request(&self, handle: NativeRequestHandle) -> Result<(), NativeError>;

    /// Delete a request. Idempotent: deleting an unknown handle succeeds.
    fn delete_request(&self, handle: NativeRequestHandle) -> Result<(), NativeError>;

    /// Drain events queued by the debuggee, blocking up to `timeout`. An
    /// empty vector means the timeout elapsed with nothing queued.
    fn poll_events(&self, timeout: Duration) -> Result<Vec<NativeEvent>, NativeError>;
}

/// Liveness flag shared between the dispatcher and the request managers.
/// Once terminated, request creation fails fast with `TerminalVm`.
#[derive(Debug, Default)]
pub struct VmState {
    terminated: AtomicBool,
}

impl VmState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub fn mark_terminated(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            info!("debuggee VM terminated");
        }
    }
}
