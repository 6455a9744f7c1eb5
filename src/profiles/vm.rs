// VM lifecycle profiles.
//
// vm-death is request-backed like any other kind. vm-start and
// vm-disconnect have no request form at the native layer, so their profiles
// subscribe to the raw stream directly: no memoization, no counter, and any
// request arguments the caller supplies are ignored.

use crate::arguments::{partition, Argument};
use crate::error::JdiResult;
use crate::events::{
    AuxData, EventManager, EventPayload, NativeEvent, VmDeathEvent, VmDisconnectEvent,
    VmStartEvent,
};
use crate::pipeline::Pipeline;
use crate::profiles::{open_plain_pipeline, ProfileCore};
use crate::requests::{ArgsKey, VmDeathRequestManager};
use crate::types::EventKind;
use std::sync::Arc;
use tracing::debug;

fn project_start(event: &NativeEvent) -> Option<VmStartEvent> {
    match &event.payload {
        EventPayload::VmStart(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_death(event: &NativeEvent) -> Option<VmDeathEvent> {
    match &event.payload {
        EventPayload::VmDeath(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_disconnect(event: &NativeEvent) -> Option<VmDisconnectEvent> {
    match &event.payload {
        EventPayload::VmDisconnect(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct VmDeathProfile {
    core: ProfileCore<ArgsKey, VmDeathEvent>,
}

impl VmDeathProfile {
    pub fn new(manager: Arc<VmDeathRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::VmDeath, manager, events, project_death),
        }
    }

    pub fn on_vm_death_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(VmDeathEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_vm_death(&self, extra: Vec<Argument>) -> JdiResult<Pipeline<VmDeathEvent>> {
        Ok(self
            .on_vm_death_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<VmDeathRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct VmStartProfile {
    events: EventManager,
}

impl VmStartProfile {
    pub fn new(events: EventManager) -> Self {
        Self { events }
    }

    pub fn on_vm_start_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(VmStartEvent, AuxData)>> {
        let (request_args, event_args, other) = partition(extra);
        if !request_args.is_empty() || !other.is_empty() {
            debug!("vm-start subscriptions have no request; request arguments ignored");
        }
        Ok(open_plain_pipeline(
            &self.events,
            EventKind::VmStart,
            event_args,
            project_start,
        ))
    }

    pub fn on_vm_start(&self, extra: Vec<Argument>) -> JdiResult<Pipeline<VmStartEvent>> {
        Ok(self
            .on_vm_start_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }
}

pub struct VmDisconnectProfile {
    events: EventManager,
}

impl VmDisconnectProfile {
    pub fn new(events: EventManager) -> Self {
        Self { events }
    }

    pub fn on_vm_disconnect_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(VmDisconnectEvent, AuxData)>> {
        let (request_args, event_args, other) = partition(extra);
        if !request_args.is_empty() || !other.is_empty() {
            debug!("vm-disconnect subscriptions have no request; request arguments ignored");
        }
        Ok(open_plain_pipeline(
            &self.events,
            EventKind::VmDisconnect,
            event_args,
            project_disconnect,
        ))
    }

    pub fn on_vm_disconnect(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<VmDisconnectEvent>> {
        Ok(self
            .on_vm_disconnect_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }
}
