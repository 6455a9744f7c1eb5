// Breakpoint requests, keyed by source file and line.

use crate::arguments::RequestArg;
use crate::connection::{DebuggerConnection, VmState};
use crate::error::JdiResult;
use crate::requests::{RequestKey, RequestManager};
use crate::types::{EventKind, RequestId};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BreakpointKey {
    pub source_name: String,
    pub line_number: u32,
}

impl RequestKey for BreakpointKey {}

pub type BreakpointRequestManager = RequestManager<BreakpointKey>;

impl RequestManager<BreakpointKey> {
    pub fn new_breakpoint(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::Breakpoint,
            connection,
            vm,
            Box::new(move |key: &BreakpointKey, suspend, modifiers| {
                conn.create_breakpoint_request(
                    &key.source_name,
                    key.line_number,
                    suspend,
                    modifiers,
                )
            }),
        )
    }

    pub fn create(
        &self,
        source_name: &str,
        line_number: u32,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_for_key(
            BreakpointKey {
                source_name: source_name.to_owned(),
                line_number,
            },
            args,
        )
    }

    pub fn create_with_id(
        &self,
        id: RequestId,
        source_name: &str,
        line_number: u32,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_with_id_for_key(
            id,
            BreakpointKey {
                source_name: source_name.to_owned(),
                line_number,
            },
            args,
        )
    }
}
