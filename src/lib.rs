// Reactive request/event pipeline layer for JDI-style debuggers
//
// Profiles hand out lazy, closable event pipelines; underlying debugger
// requests are memoized per argument tuple and reference-counted per
// subscriber, and events are correlated back to their originating request
// through a unique-id property/filter pair:
// - Request managers (two concurrent indices per event kind)
// - Event manager (single dispatcher thread, filtered fan-out)
// - Pipelines (map/filter/close push-streams)
// - Memoization cell (cache with external invalidation)

pub mod arguments;
pub mod connection;
pub mod error;
pub mod events;
pub mod memo;
pub mod mock;
pub mod pipeline;
pub mod profiles;
pub mod requests;
pub mod session;
pub mod types;

pub use arguments::{partition, Argument, CustomFilter, EventArg, RequestArg, WildcardPattern};
pub use connection::{DebuggerConnection, NativeError, NativeModifier, VmState};
pub use error::{JdiError, JdiResult};
pub use events::{AuxData, AuxDatum, EventManager, NativeEvent};
pub use pipeline::Pipeline;
pub use session::DebugSession;
pub use types::{
    EventKind, Location, RequestId, StepDepth, StepSize, SuspendPolicy, Value,
};
