// Common identifiers and value types
//
// Shared across the request managers, the event manager and the profiles.

use crate::error::{JdiError, JdiResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// Object ids are opaque 8-byte handles minted by the debuggee
pub type ObjectId = u64;
pub type ThreadId = ObjectId;
pub type ArrayId = ObjectId;

/// Handle of a request installed into the debuggee by the low-level layer.
pub type NativeRequestHandle = i32;

/// Synthetic identifier correlating emitted events back to the request that
/// produced them. Generated per create call, stored as a request property
/// and matched by the twin event filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The fixed categories of debuggee events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    VmStart,
    VmDeath,
    VmDisconnect,
    ThreadStart,
    ThreadDeath,
    ClassPrepare,
    ClassUnload,
    Breakpoint,
    Step,
    MethodEntry,
    MethodExit,
    Exception,
    MonitorWait,
    MonitorWaited,
    MonitorContendedEnter,
    MonitorContendedEntered,
    AccessWatchpoint,
    ModificationWatchpoint,
}

impl EventKind {
    /// Terminal kinds end the dispatcher loop and close every live stream.
    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::VmDeath | EventKind::VmDisconnect)
    }
}

/// Suspend policy applied when a request fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuspendPolicy {
    None,
    EventThread,
    All,
}

/// Granularity of a step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepSize {
    Min,
    Line,
}

/// Direction of a step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepDepth {
    Into,
    Over,
    Out,
}

/// A code position inside the debuggee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Binary name of the declaring type, e.g. `com.example.Main`.
    pub declaring_type: String,
    pub method_name: String,
    /// Source file name, e.g. `Main.java`.
    pub source_name: String,
    pub line_number: u32,
    /// Bytecode index within the method.
    pub code_index: u64,
}

/// A value observed in the debuggee (method-exit return values, watchpoint
/// payloads). `Unknown` carries a tag the wrapper does not recognize; the
/// dispatch layer logs and drops events carrying one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Void,
    Null,
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(ObjectId),
    Array(ArrayId),
    Unknown(u8),
}

impl Value {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Boolean(_)
                | Value::Byte(_)
                | Value::Char(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
        )
    }

    /// Object id of this value, or `NotAnObject` for anything else.
    pub fn as_object(&self) -> JdiResult<ObjectId> {
        match self {
            Value::Object(id) => Ok(*id),
            Value::Unknown(tag) => Err(JdiError::UnknownValue(*tag)),
            _ => Err(JdiError::NotAnObject),
        }
    }

    /// Array id of this value, or `NotAnArray` for anything else.
    pub fn as_array(&self) -> JdiResult<ArrayId> {
        match self {
            Value::Array(id) => Ok(*id),
            Value::Unknown(tag) => Err(JdiError::UnknownValue(*tag)),
            _ => Err(JdiError::NotAnArray),
        }
    }

    /// The value itself if it is a primitive, `NotAPrimitive` otherwise.
    pub fn as_primitive(&self) -> JdiResult<&Value> {
        match self {
            v if v.is_primitive() => Ok(v),
            Value::Unknown(tag) => Err(JdiError::UnknownValue(*tag)),
            _ => Err(JdiError::NotAPrimitive),
        }
    }

    /// Format value for display
    pub fn format(&self) -> String {
        match self {
            Value::Void => "(void)".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(v) => format!("(boolean) {}", v),
            Value::Byte(v) => format!("(byte) {}", v),
            Value::Char(v) => {
                format!("(char) '{}'", char::from_u32(*v as u32).unwrap_or('?'))
            }
            Value::Short(v) => format!("(short) {}", v),
            Value::Int(v) => format!("(int) {}", v),
            Value::Long(v) => format!("(long) {}", v),
            Value::Float(v) => format!("(float) {}", v),
            Value::Double(v) => format!("(double) {}", v),
            Value::Object(id) => format!("(object) @{:x}", id),
            Value::Array(id) => format!("(array) @{:x}", id),
            Value::Unknown(tag) => format!("(unknown tag {:#04x})", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Object(7).as_object().unwrap(), 7);
        assert!(matches!(
            Value::Int(1).as_object(),
            Err(JdiError::NotAnObject)
        ));
        assert!(matches!(
            Value::Object(7).as_array(),
            Err(JdiError::NotAnArray)
        ));
        assert!(matches!(
            Value::Null.as_primitive(),
            Err(JdiError::NotAPrimitive)
        ));
        assert!(matches!(
            Value::Unknown(0x7f).as_primitive(),
            Err(JdiError::UnknownValue(0x7f))
        ));
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(EventKind::VmDeath.is_terminal());
        assert!(EventKind::VmDisconnect.is_terminal());
        assert!(!EventKind::Breakpoint.is_terminal());
    }
}
