// Breakpoint profile.

use crate::arguments::Argument;
use crate::error::JdiResult;
use crate::events::{AuxData, BreakpointEvent, EventManager, EventPayload, NativeEvent};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{BreakpointKey, BreakpointRequestManager};
use crate::types::EventKind;
use std::sync::Arc;

fn project(event: &NativeEvent) -> Option<BreakpointEvent> {
    match &event.payload {
        EventPayload::Breakpoint(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct BreakpointProfile {
    core: ProfileCore<BreakpointKey, BreakpointEvent>,
}

impl BreakpointProfile {
    pub fn new(manager: Arc<BreakpointRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::Breakpoint, manager, events, project),
        }
    }

    /// Stream of breakpoint events for a source position, with aux data.
    pub fn on_breakpoint_with_data(
        &self,
        source_name: &str,
        line_number: u32,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(BreakpointEvent, AuxData)>> {
        self.core.subscribe(
            BreakpointKey {
                source_name: source_name.to_owned(),
                line_number,
            },
            extra,
            Vec::new(),
        )
    }

    pub fn on_breakpoint(
        &self,
        source_name: &str,
        line_number: u32,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<BreakpointEvent>> {
        Ok(self
            .on_breakpoint_with_data(source_name, line_number, extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<BreakpointRequestManager> {
        self.core.manager()
    }

    /// Number of distinct subscriber keys with open pipelines.
    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
