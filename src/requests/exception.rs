// Exception requests, keyed by exception class and notify flags.
//
// A `None` exception class is the catch-all request covering every throwable.

use crate::arguments::RequestArg;
use crate::connection::{DebuggerConnection, VmState};
use crate::error::JdiResult;
use crate::requests::{RequestKey, RequestManager};
use crate::types::{EventKind, RequestId};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionKey {
    pub exception_class: Option<String>,
    pub notify_caught: bool,
    pub notify_uncaught: bool,
}

impl RequestKey for ExceptionKey {}

pub type ExceptionRequestManager = RequestManager<ExceptionKey>;

impl RequestManager<ExceptionKey> {
    pub fn new_exception(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::Exception,
            connection,
            vm,
            Box::new(move |key: &ExceptionKey, suspend, modifiers| {
                conn.create_exception_request(
                    key.exception_class.as_deref(),
                    key.notify_caught,
                    key.notify_uncaught,
                    suspend,
                    modifiers,
                )
            }),
        )
    }

    pub fn create(
        &self,
        exception_class: Option<&str>,
        notify_caught: bool,
        notify_uncaught: bool,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_for_key(
            ExceptionKey {
                exception_class: exception_class.map(str::to_owned),
                notify_caught,
                notify_uncaught,
            },
            args,
        )
    }

    pub fn create_with_id(
        &self,
        id: RequestId,
        exception_class: Option<&str>,
        notify_caught: bool,
        notify_uncaught: bool,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_with_id_for_key(
            id,
            ExceptionKey {
                exception_class: exception_class.map(str::to_owned),
                notify_caught,
                notify_uncaught,
            },
            args,
        )
    }
}
