// Field watchpoint requests, keyed by class and field name.

use crate::arguments::RequestArg;
use crate::connection::{DebuggerConnection, VmState};
use crate::error::JdiResult;
use crate::requests::{RequestKey, RequestManager};
use crate::types::{EventKind, RequestId};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchpointKey {
    pub class_name: String,
    pub field_name: String,
}

impl RequestKey for WatchpointKey {}

pub type AccessWatchpointRequestManager = RequestManager<WatchpointKey>;
pub type ModificationWatchpointRequestManager = RequestManager<WatchpointKey>;

impl RequestManager<WatchpointKey> {
    pub fn new_access_watchpoint(
        connection: Arc<dyn DebuggerConnection>,
        vm: Arc<VmState>,
    ) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::AccessWatchpoint,
            connection,
            vm,
            Box::new(move |key: &WatchpointKey, suspend, modifiers| {
                conn.create_access_watchpoint_request(
                    &key.class_name,
                    &key.field_name,
                    suspend,
                    modifiers,
                )
            }),
        )
    }

    pub fn new_modification_watchpoint(
        connection: Arc<dyn DebuggerConnection>,
        vm: Arc<VmState>,
    ) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::ModificationWatchpoint,
            connection,
            vm,
            Box::new(move |key: &WatchpointKey, suspend, modifiers| {
                conn.create_modification_watchpoint_request(
                    &key.class_name,
                    &key.field_name,
                    suspend,
                    modifiers,
                )
            }),
        )
    }

    pub fn create(
        &self,
        class_name: &str,
        field_name: &str,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_for_key(
            WatchpointKey {
                class_name: class_name.to_owned(),
                field_name: field_name.to_owned(),
            },
            args,
        )
    }

    pub fn create_with_id(
        &self,
        id: RequestId,
        class_name: &str,
        field_name: &str,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_with_id_for_key(
            id,
            WatchpointKey {
                class_name: class_name.to_owned(),
                field_name: field_name.to_owned(),
            },
            args,
        )
    }
}
