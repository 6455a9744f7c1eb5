// Class prepare/unload requests, argument-set keyed.

use crate::connection::{DebuggerConnection, VmState};
use crate::requests::{ArgsKey, RequestManager};
use crate::types::EventKind;
use std::sync::Arc;

pub type ClassPrepareRequestManager = RequestManager<ArgsKey>;
pub type ClassUnloadRequestManager = RequestManager<ArgsKey>;

impl RequestManager<ArgsKey> {
    pub fn new_class_prepare(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::ClassPrepare,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_class_prepare_request(suspend, modifiers)
            }),
        )
    }

    pub fn new_class_unload(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::ClassUnload,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_class_unload_request(suspend, modifiers)
            }),
        )
    }
}
