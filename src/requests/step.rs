// Step requests, keyed by thread, size and depth.
//
// Step requests are single-shot: the step profile chains an automatic
// removal onto the head of the event stream.

use crate::arguments::RequestArg;
use crate::connection::{DebuggerConnection, VmState};
use crate::error::JdiResult;
use crate::requests::{RequestKey, RequestManager};
use crate::types::{EventKind, RequestId, StepDepth, StepSize, ThreadId};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepKey {
    pub thread: ThreadId,
    pub size: StepSize,
    pub depth: StepDepth,
}

impl RequestKey for StepKey {}

pub type StepRequestManager = RequestManager<StepKey>;

impl RequestManager<StepKey> {
    pub fn new_step(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::Step,
            connection,
            vm,
            Box::new(move |key: &StepKey, suspend, modifiers| {
                conn.create_step_request(key.thread, key.size, key.depth, suspend, modifiers)
            }),
        )
    }

    pub fn create(
        &self,
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_for_key(
            StepKey {
                thread,
                size,
                depth,
            },
            args,
        )
    }

    pub fn create_with_id(
        &self,
        id: RequestId,
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_with_id_for_key(
            id,
            StepKey {
                thread,
                size,
                depth,
            },
            args,
        )
    }
}
