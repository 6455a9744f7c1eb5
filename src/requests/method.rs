// Method entry/exit requests, keyed by class and method name.
//
// The native request carries no method notion: the class arrives as a
// default class-inclusion filter and the method name is matched at dispatch
// time by the profile's event filter.

use crate::arguments::{RequestArg, WildcardPattern};
use crate::connection::{DebuggerConnection, VmState};
use crate::error::JdiResult;
use crate::requests::{RequestKey, RequestManager};
use crate::types::{EventKind, RequestId};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub class_name: String,
    pub method_name: String,
}

impl RequestKey for MethodKey {
    fn default_args(&self) -> Vec<RequestArg> {
        vec![RequestArg::ClassInclusion(WildcardPattern::new(
            self.class_name.clone(),
        ))]
    }
}

pub type MethodEntryRequestManager = RequestManager<MethodKey>;
pub type MethodExitRequestManager = RequestManager<MethodKey>;

impl RequestManager<MethodKey> {
    pub fn new_method_entry(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::MethodEntry,
            connection,
            vm,
            Box::new(move |_key: &MethodKey, suspend, modifiers| {
                conn.create_method_entry_request(suspend, modifiers)
            }),
        )
    }

    pub fn new_method_exit(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::MethodExit,
            connection,
            vm,
            Box::new(move |_key: &MethodKey, suspend, modifiers| {
                conn.create_method_exit_request(suspend, modifiers)
            }),
        )
    }

    pub fn create(
        &self,
        class_name: &str,
        method_name: &str,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_for_key(
            MethodKey {
                class_name: class_name.to_owned(),
                method_name: method_name.to_owned(),
            },
            args,
        )
    }

    pub fn create_with_id(
        &self,
        id: RequestId,
        class_name: &str,
        method_name: &str,
        args: Vec<RequestArg>,
    ) -> JdiResult<RequestId> {
        self.create_with_id_for_key(
            id,
            MethodKey {
                class_name: class_name.to_owned(),
                method_name: method_name.to_owned(),
            },
            args,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::NativeModifier;
    use crate::mock::MockConnection;

    #[test]
    fn test_class_inclusion_default_is_installed() {
        let mock = MockConnection::new();
        let manager = MethodEntryRequestManager::new_method_entry(
            Arc::new(mock.clone()),
            Arc::new(VmState::new()),
        );
        manager.create("com.example.Foo", "bar", vec![]).unwrap();

        let request = &mock.live_requests(EventKind::MethodEntry)[0];
        assert!(request
            .modifiers
            .contains(&NativeModifier::ClassMatch("com.example.Foo".to_owned())));
    }

    #[test]
    fn test_entry_and_exit_are_separate_kinds() {
        let mock = MockConnection::new();
        let vm = Arc::new(VmState::new());
        let entry =
            MethodEntryRequestManager::new_method_entry(Arc::new(mock.clone()), vm.clone());
        let exit = MethodExitRequestManager::new_method_exit(Arc::new(mock.clone()), vm);

        entry.create("A", "m", vec![]).unwrap();
        exit.create("A", "m", vec![]).unwrap();
        assert_eq!(mock.created(EventKind::MethodEntry), 1);
        assert_eq!(mock.created(EventKind::MethodExit), 1);
    }
}
