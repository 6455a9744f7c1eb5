// Exception profile, keyed by exception class and notify flags.

use crate::arguments::Argument;
use crate::error::JdiResult;
use crate::events::{AuxData, EventManager, EventPayload, ExceptionEvent, NativeEvent};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{ExceptionKey, ExceptionRequestManager};
use crate::types::EventKind;
use std::sync::Arc;

fn project(event: &NativeEvent) -> Option<ExceptionEvent> {
    match &event.payload {
        EventPayload::Exception(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct ExceptionProfile {
    core: ProfileCore<ExceptionKey, ExceptionEvent>,
}

impl ExceptionProfile {
    pub fn new(manager: Arc<ExceptionRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::Exception, manager, events, project),
        }
    }

    /// Stream of exception events for one throwable class.
    pub fn on_exception_with_data(
        &self,
        exception_class: &str,
        notify_caught: bool,
        notify_uncaught: bool,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(ExceptionEvent, AuxData)>> {
        self.core.subscribe(
            ExceptionKey {
                exception_class: Some(exception_class.to_owned()),
                notify_caught,
                notify_uncaught,
            },
            extra,
            Vec::new(),
        )
    }

    pub fn on_exception(
        &self,
        exception_class: &str,
        notify_caught: bool,
        notify_uncaught: bool,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<ExceptionEvent>> {
        Ok(self
            .on_exception_with_data(exception_class, notify_caught, notify_uncaught, extra)?
            .map(|(event, _)| event.clone()))
    }

    /// Catch-all stream covering every throwable.
    pub fn on_all_exceptions_with_data(
        &self,
        notify_caught: bool,
        notify_uncaught: bool,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(ExceptionEvent, AuxData)>> {
        self.core.subscribe(
            ExceptionKey {
                exception_class: None,
                notify_caught,
                notify_uncaught,
            },
            extra,
            Vec::new(),
        )
    }

    pub fn on_all_exceptions(
        &self,
        notify_caught: bool,
        notify_uncaught: bool,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<ExceptionEvent>> {
        Ok(self
            .on_all_exceptions_with_data(notify_caught, notify_uncaught, extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<ExceptionRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
