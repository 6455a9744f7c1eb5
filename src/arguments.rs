// Request and event arguments
//
// Request arguments carry creation-time semantics (filters installed on the
// native request); event arguments carry dispatch-time semantics (applied to
// in-flight events). The unique-id property exists in both forms: a property
// written onto the request, and a twin filter matching the events it emits.

use crate::connection::NativeModifier;
use crate::events::NativeEvent;
use crate::types::{ObjectId, RequestId, SuspendPolicy, ThreadId};
use std::fmt;
use std::sync::Arc;

/// Key under which the correlation id is stored in request properties.
pub const UNIQUE_ID_PROPERTY: &str = "unique-request-id";

/// Class name pattern with an optional leading or trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WildcardPattern(String);

impl WildcardPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.0 == "*" {
            return true;
        }
        if let Some(suffix) = self.0.strip_prefix('*') {
            return name.ends_with(suffix);
        }
        if let Some(prefix) = self.0.strip_suffix('*') {
            return name.starts_with(prefix);
        }
        name == self.0
    }
}

impl From<&str> for WildcardPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Filter applied when creating a native request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestArg {
    ClassInclusion(WildcardPattern),
    ClassExclusion(WildcardPattern),
    InstanceOnly(ObjectId),
    Count(i32),
    ThreadOnly(ThreadId),
    SuspendPolicy(SuspendPolicy),
    Enabled(bool),
    /// Correlation id stored as a request property.
    UniqueId(RequestId),
    /// User-defined property, passed through to the native layer.
    Property { key: String, value: String },
    /// Unrecognized modifier forwarded to the native layer unchanged.
    Native(NativeModifier),
}

impl RequestArg {
    /// Native representation of this argument, if it has one. Suspend policy
    /// and the enabled flag are consumed by the create call itself.
    pub(crate) fn to_modifier(&self) -> Option<NativeModifier> {
        match self {
            RequestArg::ClassInclusion(pattern) => {
                Some(NativeModifier::ClassMatch(pattern.as_str().to_owned()))
            }
            RequestArg::ClassExclusion(pattern) => {
                Some(NativeModifier::ClassExclude(pattern.as_str().to_owned()))
            }
            RequestArg::InstanceOnly(id) => Some(NativeModifier::InstanceOnly(*id)),
            RequestArg::Count(n) => Some(NativeModifier::Count(*n)),
            RequestArg::ThreadOnly(thread) => Some(NativeModifier::ThreadOnly(*thread)),
            RequestArg::SuspendPolicy(_) | RequestArg::Enabled(_) => None,
            RequestArg::UniqueId(id) => Some(NativeModifier::Property {
                key: UNIQUE_ID_PROPERTY.to_owned(),
                value: id.as_str().to_owned(),
            }),
            RequestArg::Property { key, value } => Some(NativeModifier::Property {
                key: key.clone(),
                value: value.clone(),
            }),
            RequestArg::Native(modifier) => Some(modifier.clone()),
        }
    }
}

/// User-defined event filter with an optional data extractor. Extracted
/// values come back to the subscriber as aux data.
#[derive(Clone)]
pub struct CustomFilter {
    name: String,
    predicate: Arc<dyn Fn(&NativeEvent) -> bool + Send + Sync>,
    extractor: Option<Arc<dyn Fn(&NativeEvent) -> Option<String> + Send + Sync>>,
}

impl CustomFilter {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&NativeEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            extractor: None,
        }
    }

    /// Opt this filter into data extraction.
    pub fn with_extractor(
        mut self,
        extractor: impl Fn(&NativeEvent) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFilter")
            .field("name", &self.name)
            .field("extracts", &self.extractor.is_some())
            .finish()
    }
}

/// Filter applied when dispatching events to a subscriber.
#[derive(Debug, Clone)]
pub enum EventArg {
    /// Accept events whose location names this method.
    MethodName(String),
    /// Accept events whose source request carries this correlation id.
    UniqueId(RequestId),
    ClassInclusion(WildcardPattern),
    ClassExclusion(WildcardPattern),
    Custom(CustomFilter),
}

impl EventArg {
    pub fn accepts(&self, event: &NativeEvent) -> bool {
        match self {
            EventArg::MethodName(name) => event
                .location()
                .map_or(false, |location| location.method_name == *name),
            EventArg::UniqueId(id) => {
                event.property(UNIQUE_ID_PROPERTY) == Some(id.as_str())
            }
            EventArg::ClassInclusion(pattern) => event
                .declaring_type_name()
                .map_or(false, |name| pattern.matches(name)),
            EventArg::ClassExclusion(pattern) => event
                .declaring_type_name()
                .map_or(true, |name| !pattern.matches(name)),
            EventArg::Custom(filter) => (filter.predicate)(event),
        }
    }

    /// Aux datum contributed by this argument, if it opted into extraction.
    pub fn extract(&self, event: &NativeEvent) -> Option<(String, String)> {
        match self {
            EventArg::Custom(filter) => filter
                .extractor
                .as_ref()
                .and_then(|extract| extract(event))
                .map(|value| (filter.name.clone(), value)),
            _ => None,
        }
    }

    /// Stable identity used for subscriber-counter keys.
    pub fn identity(&self) -> String {
        match self {
            EventArg::MethodName(name) => format!("method-name:{name}"),
            EventArg::UniqueId(id) => format!("unique-id:{id}"),
            EventArg::ClassInclusion(pattern) => format!("class-include:{}", pattern.as_str()),
            EventArg::ClassExclusion(pattern) => format!("class-exclude:{}", pattern.as_str()),
            EventArg::Custom(filter) => format!("custom:{}", filter.name),
        }
    }
}

impl RequestId {
    /// Property view of this id, stored on the request at creation.
    pub fn as_property(&self) -> RequestArg {
        RequestArg::UniqueId(self.clone())
    }

    /// Filter view of this id, matching the events the request emits.
    pub fn as_filter(&self) -> EventArg {
        EventArg::UniqueId(self.clone())
    }
}

/// A heterogeneous profile argument.
#[derive(Debug, Clone)]
pub enum Argument {
    Request(RequestArg),
    Event(EventArg),
    /// Unknown extension, passed through to the low-level layer unchanged.
    Other(NativeModifier),
}

impl From<RequestArg> for Argument {
    fn from(arg: RequestArg) -> Self {
        Argument::Request(arg)
    }
}

impl From<EventArg> for Argument {
    fn from(arg: EventArg) -> Self {
        Argument::Event(arg)
    }
}

impl From<NativeModifier> for Argument {
    fn from(modifier: NativeModifier) -> Self {
        Argument::Other(modifier)
    }
}

/// Split a heterogeneous argument sequence into request arguments, event
/// arguments and passthrough modifiers, preserving order within each bucket.
pub fn partition(args: Vec<Argument>) -> (Vec<RequestArg>, Vec<EventArg>, Vec<NativeModifier>) {
    let mut request_args = Vec::new();
    let mut event_args = Vec::new();
    let mut other = Vec::new();
    for arg in args {
        match arg {
            Argument::Request(arg) => request_args.push(arg),
            Argument::Event(arg) => event_args.push(arg),
            Argument::Other(modifier) => other.push(modifier),
        }
    }
    (request_args, event_args, other)
}

/// Request-arg identity is modulo the unique-id property: strip it before
/// comparing or keying argument sets.
pub(crate) fn strip_unique_id(args: &[RequestArg]) -> Vec<RequestArg> {
    args.iter()
        .filter(|arg| !matches!(arg, RequestArg::UniqueId(_)))
        .cloned()
        .collect()
}

/// A unique id supplied by the caller takes precedence over generation.
pub(crate) fn supplied_unique_id(args: &[RequestArg]) -> Option<RequestId> {
    args.iter().find_map(|arg| match arg {
        RequestArg::UniqueId(id) => Some(id.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BreakpointEvent, EventPayload};
    use crate::types::Location;

    fn breakpoint_event() -> NativeEvent {
        NativeEvent::new(EventPayload::Breakpoint(BreakpointEvent {
            thread: 1,
            location: Location {
                declaring_type: "com.example.Main".to_owned(),
                method_name: "run".to_owned(),
                source_name: "Main.java".to_owned(),
                line_number: 10,
                code_index: 0,
            },
        }))
    }

    #[test]
    fn test_wildcard_patterns() {
        assert!(WildcardPattern::new("*").matches("anything"));
        assert!(WildcardPattern::new("com.example.*").matches("com.example.Main"));
        assert!(!WildcardPattern::new("com.example.*").matches("org.example.Main"));
        assert!(WildcardPattern::new("*.Main").matches("com.example.Main"));
        assert!(WildcardPattern::new("com.example.Main").matches("com.example.Main"));
        assert!(!WildcardPattern::new("com.example.Main").matches("com.example.Other"));
    }

    #[test]
    fn test_partition_preserves_bucket_order() {
        let args = vec![
            Argument::Event(EventArg::MethodName("a".to_owned())),
            Argument::Request(RequestArg::Count(1)),
            Argument::Other(NativeModifier::Count(9)),
            Argument::Request(RequestArg::Enabled(false)),
            Argument::Event(EventArg::MethodName("b".to_owned())),
        ];
        let (request_args, event_args, other) = partition(args);
        assert_eq!(
            request_args,
            vec![RequestArg::Count(1), RequestArg::Enabled(false)]
        );
        assert_eq!(event_args.len(), 2);
        assert_eq!(event_args[0].identity(), "method-name:a");
        assert_eq!(event_args[1].identity(), "method-name:b");
        assert_eq!(other, vec![NativeModifier::Count(9)]);
    }

    #[test]
    fn test_unique_id_round_trip() {
        let id = RequestId::generate();
        let args = vec![RequestArg::Count(2), id.as_property()];
        assert_eq!(supplied_unique_id(&args), Some(id.clone()));
        assert_eq!(strip_unique_id(&args), vec![RequestArg::Count(2)]);

        let modifier = id.as_property().to_modifier().unwrap();
        assert_eq!(
            modifier,
            NativeModifier::Property {
                key: UNIQUE_ID_PROPERTY.to_owned(),
                value: id.as_str().to_owned(),
            }
        );
    }

    #[test]
    fn test_unique_id_filter_matches_properties() {
        let id = RequestId::generate();
        let mut event = breakpoint_event();
        assert!(!id.as_filter().accepts(&event));

        event
            .request_properties
            .push((UNIQUE_ID_PROPERTY.to_owned(), id.as_str().to_owned()));
        assert!(id.as_filter().accepts(&event));
        assert!(!RequestId::generate().as_filter().accepts(&event));
    }

    #[test]
    fn test_method_name_and_class_filters() {
        let event = breakpoint_event();
        assert!(EventArg::MethodName("run".to_owned()).accepts(&event));
        assert!(!EventArg::MethodName("main".to_owned()).accepts(&event));
        assert!(EventArg::ClassInclusion("com.example.*".into()).accepts(&event));
        assert!(!EventArg::ClassExclusion("com.example.*".into()).accepts(&event));
        assert!(EventArg::ClassExclusion("org.*".into()).accepts(&event));
    }

    #[test]
    fn test_custom_filter_extraction() {
        let filter = CustomFilter::new("line", |event| event.location().is_some())
            .with_extractor(|event| event.location().map(|l| l.line_number.to_string()));
        let arg = EventArg::Custom(filter);
        let event = breakpoint_event();

        assert!(arg.accepts(&event));
        assert_eq!(
            arg.extract(&event),
            Some(("line".to_owned(), "10".to_owned()))
        );
        assert_eq!(arg.identity(), "custom:line");
    }
}
