// End-to-end scenarios against the mock connection with a live dispatcher.

use jdi_observe::events::{
    EventPayload, MethodEntryEvent, MethodExitEvent, MonitorWaitEvent, StepEvent,
};
use jdi_observe::mock::MockConnection;
use jdi_observe::{
    DebugSession, EventKind, JdiError, Location, RequestArg, StepDepth, StepSize, Value,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn attach() -> (DebugSession, MockConnection) {
    init_tracing();
    let mock = MockConnection::new();
    let session = DebugSession::attach(Arc::new(mock.clone()));
    (session, mock)
}

fn location(class: &str, method: &str) -> Location {
    Location {
        declaring_type: class.to_owned(),
        method_name: method.to_owned(),
        source_name: "Main.java".to_owned(),
        line_number: 42,
        code_index: 0,
    }
}

/// Spin until `cond` holds; panics with `what` after a couple of seconds.
fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {what}");
}

#[test]
fn shared_request_dedup_and_teardown() {
    let (session, mock) = attach();

    let first = session
        .method_entry()
        .on_method_entry("com.x.Foo", "bar", vec![])
        .unwrap();
    let second = session
        .method_entry()
        .on_method_entry("com.x.Foo", "bar", vec![])
        .unwrap();
    assert_eq!(mock.created(EventKind::MethodEntry), 1);

    let rx_first = first.channel();
    let rx_second = second.channel();
    let handle = mock.live_requests(EventKind::MethodEntry)[0].handle;
    mock.emit_for(
        handle,
        EventPayload::MethodEntry(MethodEntryEvent {
            thread: 1,
            location: location("com.x.Foo", "bar"),
        }),
    );

    let event = rx_first.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(event.location.method_name, "bar");
    assert!(rx_second.recv_timeout(RECV_TIMEOUT).is_ok());

    first.close();
    assert_eq!(
        mock.live_requests(EventKind::MethodEntry).len(),
        1,
        "request must survive while a subscriber remains"
    );

    second.close();
    assert!(
        mock.live_requests(EventKind::MethodEntry).is_empty(),
        "last close must delete the native request"
    );
    assert_eq!(session.method_entry().subscription_count(), 0);
}

#[test]
fn correlation_filter_separates_subscribers() {
    let (session, mock) = attach();

    let rx_five = session
        .monitor_wait()
        .on_monitor_wait(vec![RequestArg::Count(5).into()])
        .unwrap()
        .channel();
    let rx_ten = session
        .monitor_wait()
        .on_monitor_wait(vec![RequestArg::Count(10).into()])
        .unwrap()
        .channel();
    assert_eq!(mock.created(EventKind::MonitorWait), 2);

    let handle_five = mock
        .live_requests(EventKind::MonitorWait)
        .iter()
        .find(|request| {
            request
                .modifiers
                .contains(&jdi_observe::NativeModifier::Count(5))
        })
        .expect("request with count filter 5")
        .handle;
    mock.emit_for(
        handle_five,
        EventPayload::MonitorWait(MonitorWaitEvent {
            thread: 2,
            monitor: 0x20,
            location: location("com.x.Foo", "run"),
            timeout_ms: 100,
        }),
    );

    assert!(rx_five.recv_timeout(RECV_TIMEOUT).is_ok());
    assert!(rx_ten.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn out_of_band_removal_yields_a_fresh_request() {
    let (session, mock) = attach();

    let pipeline = session
        .method_exit()
        .on_method_exit("A", "m", vec![])
        .unwrap();
    let old_id = session.method_exit().manager().list_ids()[0].clone();

    assert!(session.method_exit().manager().remove_by_id(&old_id));
    pipeline.close();

    let _fresh = session
        .method_exit()
        .on_method_exit("A", "m", vec![])
        .unwrap();
    let new_id = session.method_exit().manager().list_ids()[0].clone();
    assert_ne!(old_id, new_id, "a fresh request must get a fresh id");
    assert_eq!(mock.created(EventKind::MethodExit), 2);
}

#[test]
fn step_requests_are_single_shot() {
    let (session, mock) = attach();

    let rx = session
        .step()
        .on_step(9, StepSize::Line, StepDepth::Over, vec![])
        .unwrap()
        .channel();
    let handle = mock.live_requests(EventKind::Step)[0].handle;

    let step_event = EventPayload::Step(StepEvent {
        thread: 9,
        location: location("com.x.Foo", "bar"),
    });
    mock.emit_for(handle, step_event.clone());
    mock.emit_for(handle, step_event);

    assert!(rx.recv_timeout(RECV_TIMEOUT).is_ok());
    // Exactly one delivery, then the pipeline closes itself
    assert!(rx.recv_timeout(RECV_TIMEOUT).is_err());
    wait_until("step request removal", || {
        mock.live_requests(EventKind::Step).is_empty()
    });
}

#[test]
fn terminal_event_closes_everything() {
    let (session, mock) = attach();

    let rx_wait = session.monitor_wait().on_monitor_wait(vec![]).unwrap().channel();
    let rx_entry = session
        .method_entry()
        .on_method_entry("com.x.Foo", "bar", vec![])
        .unwrap()
        .channel();

    mock.disconnect();

    assert!(
        rx_wait.recv_timeout(RECV_TIMEOUT).is_err(),
        "streams must close on disconnect"
    );
    assert!(rx_entry.recv_timeout(RECV_TIMEOUT).is_err());
    wait_until("counters to drain", || {
        session.monitor_wait().subscription_count() == 0
            && session.method_entry().subscription_count() == 0
    });
    assert!(session.is_terminated());

    let refused = session.monitor_wait().on_monitor_wait(vec![]);
    assert!(matches!(refused, Err(JdiError::TerminalVm)));
}

#[test]
fn creation_failure_rolls_back_and_permits_retry() {
    let (session, mock) = attach();

    mock.fail_next_create();
    let failed = session
        .breakpoint()
        .on_breakpoint("Main.java", 3, vec![]);
    assert!(matches!(failed, Err(JdiError::NativeCreationFailed(_))));
    assert!(session.breakpoint().manager().list_ids().is_empty());
    assert_eq!(session.breakpoint().subscription_count(), 0);

    // No stale memoized failure: the retry performs a fresh attempt
    let retried = session.breakpoint().on_breakpoint("Main.java", 3, vec![]);
    assert!(retried.is_ok());
    assert_eq!(mock.created(EventKind::Breakpoint), 2);
    assert_eq!(mock.live_requests(EventKind::Breakpoint).len(), 1);
}

#[test]
fn method_exit_events_carry_return_values() {
    let (session, mock) = attach();

    let rx = session
        .method_exit()
        .on_method_exit_with_data("com.x.Foo", "bar", vec![])
        .unwrap()
        .channel();
    let handle = mock.live_requests(EventKind::MethodExit)[0].handle;
    mock.emit_for(
        handle,
        EventPayload::MethodExit(MethodExitEvent {
            thread: 1,
            location: location("com.x.Foo", "bar"),
            return_value: Value::Int(41),
        }),
    );

    let (event, aux) = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(event.return_value, Value::Int(41));
    assert_eq!(event.return_value.as_primitive().unwrap(), &Value::Int(41));
    assert!(aux.is_empty());
}

#[test]
fn shutdown_closes_open_streams() {
    let (mut session, mock) = attach();
    let rx = session
        .breakpoint()
        .on_breakpoint("Main.java", 7, vec![])
        .unwrap()
        .channel();
    assert_eq!(mock.live_requests(EventKind::Breakpoint).len(), 1);

    session.shutdown();
    assert!(rx.recv_timeout(RECV_TIMEOUT).is_err());
    assert!(mock.live_requests(EventKind::Breakpoint).is_empty());
}
