// VM death requests, argument-set keyed.
//
// vm-start and vm-disconnect have no request form at the native layer; their
// profiles subscribe to the raw stream directly.

use crate::connection::{DebuggerConnection, VmState};
use crate::requests::{ArgsKey, RequestManager};
use crate::types::EventKind;
use std::sync::Arc;

pub type VmDeathRequestManager = RequestManager<ArgsKey>;

impl RequestManager<ArgsKey> {
    pub fn new_vm_death(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::VmDeath,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_vm_death_request(suspend, modifiers)
            }),
        )
    }
}
