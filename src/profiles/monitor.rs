// Monitor profiles: wait, waited, contended-enter, contended-entered.
//
// All four subscribe by argument set; the subscriber key is the argument
// sequence alone.

use crate::arguments::Argument;
use crate::error::JdiResult;
use crate::events::{
    AuxData, EventManager, EventPayload, MonitorContendedEnterEvent,
    MonitorContendedEnteredEvent, MonitorWaitEvent, MonitorWaitedEvent, NativeEvent,
};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{
    ArgsKey, MonitorContendedEnterRequestManager, MonitorContendedEnteredRequestManager,
    MonitorWaitRequestManager, MonitorWaitedRequestManager,
};
use crate::types::EventKind;
use std::sync::Arc;

fn project_wait(event: &NativeEvent) -> Option<MonitorWaitEvent> {
    match &event.payload {
        EventPayload::MonitorWait(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_waited(event: &NativeEvent) -> Option<MonitorWaitedEvent> {
    match &event.payload {
        EventPayload::MonitorWaited(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_contended_enter(event: &NativeEvent) -> Option<MonitorContendedEnterEvent> {
    match &event.payload {
        EventPayload::MonitorContendedEnter(e) => Some(e.clone()),
        _ => None,
    }
}

fn project_contended_entered(event: &NativeEvent) -> Option<MonitorContendedEnteredEvent> {
    match &event.payload {
        EventPayload::MonitorContendedEntered(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct MonitorWaitProfile {
    core: ProfileCore<ArgsKey, MonitorWaitEvent>,
}

impl MonitorWaitProfile {
    pub fn new(manager: Arc<MonitorWaitRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::MonitorWait, manager, events, project_wait),
        }
    }

    pub fn on_monitor_wait_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(MonitorWaitEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_monitor_wait(&self, extra: Vec<Argument>) -> JdiResult<Pipeline<MonitorWaitEvent>> {
        Ok(self
            .on_monitor_wait_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<MonitorWaitRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct MonitorWaitedProfile {
    core: ProfileCore<ArgsKey, MonitorWaitedEvent>,
}

impl MonitorWaitedProfile {
    pub fn new(manager: Arc<MonitorWaitedRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::MonitorWaited, manager, events, project_waited),
        }
    }

    pub fn on_monitor_waited_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(MonitorWaitedEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_monitor_waited(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<MonitorWaitedEvent>> {
        Ok(self
            .on_monitor_waited_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<MonitorWaitedRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct MonitorContendedEnterProfile {
    core: ProfileCore<ArgsKey, MonitorContendedEnterEvent>,
}

impl MonitorContendedEnterProfile {
    pub fn new(
        manager: Arc<MonitorContendedEnterRequestManager>,
        events: EventManager,
    ) -> Self {
        Self {
            core: ProfileCore::new(
                EventKind::MonitorContendedEnter,
                manager,
                events,
                project_contended_enter,
            ),
        }
    }

    pub fn on_monitor_contended_enter_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(MonitorContendedEnterEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_monitor_contended_enter(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<MonitorContendedEnterEvent>> {
        Ok(self
            .on_monitor_contended_enter_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<MonitorContendedEnterRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}

pub struct MonitorContendedEnteredProfile {
    core: ProfileCore<ArgsKey, MonitorContendedEnteredEvent>,
}

impl MonitorContendedEnteredProfile {
    pub fn new(
        manager: Arc<MonitorContendedEnteredRequestManager>,
        events: EventManager,
    ) -> Self {
        Self {
            core: ProfileCore::new(
                EventKind::MonitorContendedEntered,
                manager,
                events,
                project_contended_entered,
            ),
        }
    }

    pub fn on_monitor_contended_entered_with_data(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(MonitorContendedEnteredEvent, AuxData)>> {
        self.core.subscribe_by_args(extra)
    }

    pub fn on_monitor_contended_entered(
        &self,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<MonitorContendedEnteredEvent>> {
        Ok(self
            .on_monitor_contended_entered_with_data(extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<MonitorContendedEnteredRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
