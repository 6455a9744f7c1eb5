// Method entry/exit profiles.
//
// The method name never reaches the native request: the profile contributes
// a method-name event filter ahead of the caller's event arguments.

use crate::arguments::{Argument, EventArg};
use crate::error::JdiResult;
use crate::events::{
    AuxData, EventManager, EventPayload, MethodEntryEvent, MethodExitEvent, NativeEvent,
};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{MethodEntryRequestManager, MethodExitRequestManager, MethodKey};
use crate::types::EventKind;
use std::sync::Arc;

fn project_entry(event: &NativeEvent) -> Option<MethodEntryEvent> {
    match &event.payload {
        EventPayload::MethodEntry(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_exit(event: &NativeEvent) -> Option<MethodExitEvent> {
    match &event.payload {
        EventPayload::MethodExit(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct MethodEntryProfile {
    core: ProfileCore<MethodKey, MethodEntryEvent>,
}

impl MethodEntryProfile {
    pub fn new(manager: Arc<MethodEntryRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::MethodEntry, manager, events, project_entry),
        }
    }

    pub fn on_method_entry_with_data(
        &self,
        class_name: &str,
        method_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(MethodEntryEvent, AuxData)>> {
        self.core.subscribe(
            MethodKey {
                class_name: class_name.to_owned(),
                method_name: method_name.to_owned(),
            },
            extra,
            vec![EventArg::MethodName(method_name.to_owned())],
        )
    }

    pub fn on_method_entry(
        &self,
        class_name: &str,
        method_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<MethodEntryEvent>> {
        Ok(self
            .on_method_entry_with_data(class_name, method_name, extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<MethodEntryRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct MethodExitProfile {
    core: ProfileCore<MethodKey, MethodExitEvent>,
}

impl MethodExitProfile {
    pub fn new(manager: Arc<MethodExitRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::MethodExit, manager, events, project_exit),
        }
    }

    pub fn on_method_exit_with_data(
        &self,
        class_name: &str,
        method_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(MethodExitEvent, AuxData)>> {
        self.core.subscribe(
            MethodKey {
                class_name: class_name.to_owned(),
                method_name: method_name.to_owned(),
            },
            extra,
            vec![EventArg::MethodName(method_name.to_owned())],
        )
    }

    pub fn on_method_exit(
        &self,
        class_name: &str,
        method_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<MethodExitEvent>> {
        Ok(self
            .on_method_exit_with_data(class_name, method_name, extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<MethodExitRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
