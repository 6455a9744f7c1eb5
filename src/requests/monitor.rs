// Monitor event requests: wait, waited, contended-enter, contended-entered.
//
// All four are argument-set keyed; de-duplication happens through the
// profiles' memoization keys.

use crate::connection::{DebuggerConnection, VmState};
use crate::requests::{ArgsKey, RequestManager};
use crate::types::EventKind;
use std::sync::Arc;

pub type MonitorWaitRequestManager = RequestManager<ArgsKey>;
pub type MonitorWaitedRequestManager = RequestManager<ArgsKey>;
pub type MonitorContendedEnterRequestManager = RequestManager<ArgsKey>;
pub type MonitorContendedEnteredRequestManager = RequestManager<ArgsKey>;

impl RequestManager<ArgsKey> {
    pub fn new_monitor_wait(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::MonitorWait,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_monitor_wait_request(suspend, modifiers)
            }),
        )
    }

    pub fn new_monitor_waited(connection: Arc<dyn DebuggerConnection>, vm: Arc<VmState>) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::MonitorWaited,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_monitor_waited_request(suspend, modifiers)
            }),
        )
    }

    pub fn new_monitor_contended_enter(
        connection: Arc<dyn DebuggerConnection>,
        vm: Arc<VmState>,
    ) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::MonitorContendedEnter,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_monitor_contended_enter_request(suspend, modifiers)
            }),
        )
    }

    pub fn new_monitor_contended_entered(
        connection: Arc<dyn DebuggerConnection>,
        vm: Arc<VmState>,
    ) -> Self {
        let conn = connection.clone();
        Self::with_factory(
            EventKind::MonitorContendedEntered,
            connection,
            vm,
            Box::new(move |_key, suspend, modifiers| {
                conn.create_monitor_contended_entered_request(suspend, modifiers)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::RequestArg;
    use crate::mock::MockConnection;

    #[test]
    fn test_distinct_argument_sets_get_distinct_requests() {
        let mock = MockConnection::new();
        let manager = MonitorWaitRequestManager::new_monitor_wait(
            Arc::new(mock.clone()),
            Arc::new(VmState::new()),
        );

        let a = manager.create(vec![RequestArg::Count(5)]).unwrap();
        let b = manager.create(vec![RequestArg::Count(10)]).unwrap();
        assert_ne!(a, b);
        assert_eq!(mock.created(EventKind::MonitorWait), 2);
        assert_eq!(manager.list().len(), 2);
    }

    #[test]
    fn test_key_is_modulo_unique_id() {
        let with_id = vec![
            RequestArg::UniqueId(crate::types::RequestId::generate()),
            RequestArg::Count(5),
        ];
        let without = vec![RequestArg::Count(5)];
        assert_eq!(ArgsKey::from_args(&with_id), ArgsKey::from_args(&without));
    }
}
