// Field watchpoint profiles, keyed by class and field name.

use crate::arguments::Argument;
use crate::error::JdiResult;
use crate::events::{
    AccessWatchpointEvent, AuxData, EventManager, EventPayload, ModificationWatchpointEvent,
    NativeEvent,
};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{
    AccessWatchpointRequestManager, ModificationWatchpointRequestManager, WatchpointKey,
};
use crate::types::EventKind;
use std::sync::Arc;

fn project_access(event: &NativeEvent) -> Option<AccessWatchpointEvent> {
    match &event.payload {
        EventPayload::AccessWatchpoint(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_modification(event: &NativeEvent) -> Option<ModificationWatchpointEvent> {
    match &event.payload {
        EventPayload::ModificationWatchpoint(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct AccessWatchpointProfile {
    core: ProfileCore<WatchpointKey, AccessWatchpointEvent>,
}

impl AccessWatchpointProfile {
    pub fn new(manager: Arc<AccessWatchpointRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::AccessWatchpoint, manager, events, project_access),
        }
    }

    pub fn on_access_watchpoint_with_data(
        &self,
        class_name: &str,
        field_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(AccessWatchpointEvent, AuxData)>> {
        self.core.subscribe(
            WatchpointKey {
                class_name: class_name.to_owned(),
                field_name: field_name.to_owned(),
            },
            extra,
            Vec::new(),
        )
    }

    pub fn on_access_watchpoint(
        &self,
        class_name: &str,
        field_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<AccessWatchpointEvent>> {
        Ok(self
            .on_access_watchpoint_with_data(class_name, field_name, extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<AccessWatchpointRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct ModificationWatchpointProfile {
    core: ProfileCore<WatchpointKey, ModificationWatchpointEvent>,
}

impl ModificationWatchpointProfile {
    pub fn new(
        manager: Arc<ModificationWatchpointRequestManager>,
        events: EventManager,
    ) -> Self {
        Self {
            core: ProfileCore::new(
                EventKind::ModificationWatchpoint,
                manager,
                events,
                project_modification,
            ),
        }
    }

    pub fn on_modification_watchpoint_with_data(
        &self,
        class_name: &str,
        field_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(ModificationWatchpointEvent, AuxData)>> {
        self.core.subscribe(
            WatchpointKey {
                class_name: class_name.to_owned(),
                field_name: field_name.to_owned(),
            },
            extra,
            Vec::new(),
        )
    }

    pub fn on_modification_watchpoint(
        &self,
        class_name: &str,
        field_name: &str,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<ModificationWatchpointEvent>> {
        Ok(self
            .on_modification_watchpoint_with_data(class_name, field_name, extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<ModificationWatchpointRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
