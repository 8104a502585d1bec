//! Integration tests for console and fault capture across sessions

use std::sync::Arc;

use codepane_capture::{
    CaptureHub, Console, ConsoleSession, ConsoleValue, ErrorEvent, FaultChannels, LogLevel,
    SessionConfig,
};
use parking_lot::Mutex;

fn recording_host() -> (Arc<Console>, Arc<Mutex<Vec<String>>>) {
    let forwarded = Arc::new(Mutex::new(Vec::new()));
    let sink = forwarded.clone();
    let console = Arc::new(Console::with_sink(Arc::new(
        move |level: LogLevel, values: &[ConsoleValue]| {
            sink.lock().push(format!("{} {}", level, values.len()));
        },
    )));
    (console, forwarded)
}

#[test]
fn test_every_session_receives_console_output() {
    let (console, forwarded) = recording_host();
    let hub = CaptureHub::with_host(console, Arc::new(FaultChannels::new()));
    let first = ConsoleSession::attach(hub.clone(), SessionConfig::default());
    let second = ConsoleSession::attach(hub.clone(), SessionConfig::default());

    hub.console().error(&[ConsoleValue::from("shared"), ConsoleValue::Null]);

    for session in [&first, &second] {
        let entries = session.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].arguments(), ["shared", "null"]);
    }
    assert_eq!(forwarded.lock().len(), 1);
}

#[test]
fn test_original_behavior_restored_after_last_session() {
    let (console, forwarded) = recording_host();
    let original = console.current_sink();
    let hub = CaptureHub::with_host(console, Arc::new(FaultChannels::new()));

    let first = ConsoleSession::attach(hub.clone(), SessionConfig::default());
    let second = ConsoleSession::attach(hub.clone(), SessionConfig::default());
    drop(first);
    assert!(hub.interceptor().is_installed());
    drop(second);
    assert!(!hub.interceptor().is_installed());
    assert!(Arc::ptr_eq(&hub.console().current_sink(), &original));

    hub.console().log(&[]);
    assert_eq!(*forwarded.lock(), vec!["log 0".to_string()]);
}

#[test]
fn test_pre_existing_fault_handler_keeps_working() {
    let faults = Arc::new(FaultChannels::new());
    let host_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = host_seen.clone();
    faults.set_error_handler(Some(Arc::new(move |event: &ErrorEvent| {
        sink.lock().push(event.message.clone());
    })));

    let hub = CaptureHub::with_host(Arc::new(Console::new()), faults);
    let session = ConsoleSession::attach(hub.clone(), SessionConfig::default());

    let outcome: Option<()> = hub.faults().catch(|| panic!("render failed"));
    assert!(outcome.is_none());

    assert_eq!(*host_seen.lock(), vec![Some("render failed".to_string())]);
    let fault = session.last_fault().expect("fault recorded");
    assert_eq!(fault.message, "render failed");
    assert!(fault.origin.is_some());
    assert_eq!(session.entries()[0].level(), LogLevel::Error);
}

#[test]
fn test_circular_value_is_captured_safely() {
    let hub = CaptureHub::new();
    let session = ConsoleSession::attach(hub.clone(), SessionConfig::default());

    let node = ConsoleValue::object(vec![("name", ConsoleValue::from("root"))]);
    node.insert("self", node.clone());
    hub.console().log(&[node]);

    let text = session.to_plain_text();
    assert!(text.contains("\"self\": \"[Circular]\""));
    assert!(text.contains("\"name\": \"root\""));
}

#[tokio::test]
async fn test_failed_task_is_logged_as_rejection() {
    let hub = CaptureHub::new();
    let session = ConsoleSession::attach(hub.clone(), SessionConfig::default());

    let handle = hub.faults().spawn_observed(async {
        Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "socket closed"))
    });
    assert_eq!(handle.await.unwrap(), None);

    let entries = session.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level(), LogLevel::Warn);
    assert_eq!(
        entries[0].arguments(),
        ["Unhandled Promise rejection: socket closed"]
    );
}

#[test]
fn test_panicking_task_is_logged_as_rejection() {
    let hub = CaptureHub::new();
    let session = ConsoleSession::attach(hub.clone(), SessionConfig::default());

    let crash = true;
    let result = tokio_test::block_on(async {
        hub.faults()
            .spawn_observed(async move {
                if crash {
                    panic!("worker crashed");
                }
                Ok::<(), std::io::Error>(())
            })
            .await
    });
    assert_eq!(result.unwrap(), None);

    assert_eq!(
        session.last_fault().map(|fault| fault.message),
        Some("Unhandled Promise rejection: worker crashed".to_string())
    );
}
