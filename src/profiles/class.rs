// Class prepare/unload profiles, argument-set keyed.

use crate::arguments::Argument;
use crate::error::JdiResult;
use crate::events::{
    AuxData, ClassPrepareEvent, ClassUnloadEvent, EventManager, EventPayload, NativeEvent,
};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{ArgsKey, ClassPrepareRequestManager, ClassUnloadRequestManager};
use crate::types::EventKind;
use std::sync::Arc;

fn project_prepare(event: &NativeEvent) -> Option<ClassPrepareEvent> {
    match &event.payload {
        EventPayload::ClassPrepare(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_unload(event: &NativeEvent) -> Option<ClassUnloadEvent> {
    match &event.payload {
        EventPayload::ClassUnload(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct ClassPrepareProfile {
    core: ProfileCore<ArgsKey, ClassPrepareEvent>,
}

impl ClassPrepareProfile {
    pub fn new(manager: Arc<ClassPrepareRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::ClassPrepare, manager, events, project_prepare),
        }
    }

    pub fn on_class_prepare_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(ClassPrepareEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_class_prepare(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<ClassPrepareEvent>> {
        Ok(self
            .on_class_prepare_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<ClassPrepareRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct ClassUnloadProfile {
    core: ProfileCore<ArgsKey, ClassUnloadEvent>,
}

impl ClassUnloadProfile {
    pub fn new(manager: Arc<ClassUnloadRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::ClassUnload, manager, events, project_unload),
        }
    }

    pub fn on_class_unload_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(ClassUnloadEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_class_unload(&self, extra: Vec<Argument>) -> JdiResult<Pipeline<ClassUnloadEvent>> {
        Ok(self
            .on_class_unload_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<ClassUnloadRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
