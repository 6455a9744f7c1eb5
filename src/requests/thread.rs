// Thread start/death requests, argument-set keyed.

use crate::connection::{DebuggerConnection, VmState};
use crate::requests::{ArgsKey, RequestManager};
use crate::types::EventKind;
use std::sync::Arc;

pub type ThreadStartRequestManager = RequestManager<ArgsKey>;
pub type ThreadDeathRequestManager = RequestManager<ArgsKey>;

impl RequestManager<ArgsKey> {
    pub fn new_thread_start(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::ThreadStart,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_thread_start_request(suspend, modifiers)
            }),
        )
    }

    pub fn new_thread_death(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::ThreadDeath,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_thread_death_request(suspend, modifiers)
            }),
        )
    }
}
