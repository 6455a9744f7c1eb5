// Error types for the pipeline subsystem
//
// Creation failures are surfaced atomically; removal failures are swallowed
// by the managers and never reach these variants.

use crate::connection::NativeError;
use thiserror::Error;

pub type JdiResult<T> = Result<T, JdiError>;

#[derive(Debug, Error)]
pub enum JdiError {
    /// The low-level debugger refused to create a request. No indices were
    /// written; the caller may retry.
    #[error("native request creation failed: {0}")]
    NativeCreationFailed(#[source] NativeError),

    /// The debuggee VM has died or disconnected; request creation fails fast.
    #[error("debuggee VM has terminated")]
    TerminalVm,

    #[error("value is not an object")]
    NotAnObject,

    #[error("value is not an array")]
    NotAnArray,

    #[error("value is not a primitive")]
    NotAPrimitive,

    /// A value category the wrapper does not recognize.
    #[error("unknown value tag {0:#04x}")]
    UnknownValue(u8),
}
