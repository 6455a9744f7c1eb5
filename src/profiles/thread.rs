// Thread start/death profiles, argument-set keyed.

use crate::arguments::Argument;
use crate::error::JdiResult;
use crate::events::{
    AuxData, EventManager, EventPayload, NativeEvent, ThreadDeathEvent, ThreadStartEvent,
};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{ArgsKey, ThreadDeathRequestManager, ThreadStartRequestManager};
use crate::types::EventKind;
use std::sync::Arc;

fn project_start(event: &NativeEvent) -> Option<ThreadStartEvent> {
    match &event.payload {
        EventPayload::ThreadStart(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_death(event: &NativeEvent) -> Option<ThreadDeathEvent> {
    match &event.payload {
        EventPayload::ThreadDeath(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct ThreadStartProfile {
    core: ProfileCore<ArgsKey, ThreadStartEvent>,
}

impl ThreadStartProfile {
    pub fn new(manager: Arc<ThreadStartRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::ThreadStart, manager, events, project_start),
        }
    }

    pub fn on_thread_start_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(ThreadStartEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_thread_start(&self, extra: Vec<Argument>) -> JdiResult<Pipeline<ThreadStartEvent>> {
        Ok(self
            .on_thread_start_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<ThreadStartRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct ThreadDeathProfile {
    core: ProfileCore<ArgsKey, ThreadDeathEvent>,
}

impl ThreadDeathProfile {
    pub fn new(manager: Arc<ThreadDeathRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::ThreadDeath, manager, events, project_death),
        }
    }

    pub fn on_thread_death_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(ThreadDeathEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_thread_death(&self, extra: Vec<Argument>) -> JdiResult<Pipeline<ThreadDeathEvent>> {
        Ok(self
            .on_thread_death_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<ThreadDeathRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
