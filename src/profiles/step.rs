// Step profile, keyed by thread, size and depth.
//
// Step subscriptions are single-shot: the first matching event is delivered
// and the pipeline then closes itself, which drains the counter and removes
// the native request.

use crate::arguments::Argument;
use crate::error::JdiResult;
use crate::events::{AuxData, EventManager, EventPayload, NativeEvent, StepEvent};
use crate::pipeline::Pipeline;
use crate::profiles::ProfileCore;
use crate::requests::{StepKey, StepRequestManager};
use crate::types::{EventKind, StepDepth, StepSize, ThreadId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn project(event: &NativeEvent) -> Option<StepEvent> {
    match &event.payload {
        EventPayload::Step(e) => Some(e.clone()),
        _ => None,
    }
}

pub struct StepProfile {
    core: ProfileCore<StepKey, StepEvent>,
}

impl StepProfile {
    pub fn new(manager: Arc<StepRequestManager>, events: EventManager) -> Self {
        Self {
            core: ProfileCore::new(EventKind::Step, manager, events, project),
        }
    }

    pub fn on_step_with_data(
        &self,
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<(StepEvent, AuxData)>> {
        let data = self.core.subscribe(
            StepKey {
                thread,
                size,
                depth,
            },
            extra,
            Vec::new(),
        )?;

        // Forward the first matching event, then tear the subscription down.
        // The closer observes the same stage the single-shot gate feeds from
        // and runs after it, so the item reaches the subscriber before the
        // close takes effect.
        let fired = Arc::new(AtomicBool::new(false));
        let gate = fired.clone();
        let single = data.filter(move |_| !gate.swap(true, Ordering::SeqCst));
        let closer = single.clone();
        data.for_each(move |_| closer.close());
        Ok(single)
    }

    pub fn on_step(
        &self,
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
        extra: Vec<Argument>,
    ) -> JdiResult<Pipeline<StepEvent>> {
        Ok(self
            .on_step_with_data(thread, size, depth, extra)?
            .map(|(event, _)| event.clone()))
    }

    pub fn manager(&self) -> &Arc<StepRequestManager> {
        self.core.manager()
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }
}
