/*!
 * Notifier Tests
 * fd readiness registration, translation, and unregister
 */

use evmux::{
    EngineError, EventLoopManager, NotificationType, Notifier, NotifierActivation, NotifierError,
    PumpMode,
};
use nix::unistd::pipe;
use pretty_assertions::assert_eq;
use std::os::fd::{AsRawFd, OwnedFd};
use std::sync::{Arc, Mutex};

fn recording_notifier(
    fd: i32,
    interest: NotificationType,
) -> (Arc<Notifier>, Arc<Mutex<Vec<NotifierActivation>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let notifier = Notifier::new(fd, interest, move |activation| {
        sink.lock().unwrap().push(activation);
    });
    (notifier, seen)
}

fn write_byte(fd: &OwnedFd) {
    let written = unsafe { libc::write(fd.as_raw_fd(), b"x".as_ptr().cast(), 1) };
    assert_eq!(written, 1);
}

#[test]
fn readable_fd_posts_activation() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let (read_end, write_end) = pipe().unwrap();
    let (notifier, seen) = recording_notifier(read_end.as_raw_fd(), NotificationType::READ);

    manager.register_notifier(notifier.clone()).unwrap();
    write_byte(&write_end);
    event_loop.pump(PumpMode::WaitForEvents);

    {
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fd, read_end.as_raw_fd());
        assert_eq!(events[0].kind, NotificationType::READ);
    }

    // The byte is still buffered, but once unregistered nothing watches it.
    manager.unregister_notifier(&notifier);
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn writable_fd_posts_write_activation() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let (_read_end, write_end) = pipe().unwrap();
    let (notifier, seen) = recording_notifier(write_end.as_raw_fd(), NotificationType::WRITE);

    manager.register_notifier(notifier.clone()).unwrap();
    event_loop.pump(PumpMode::DontWait);

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, NotificationType::WRITE);
    drop(events);

    manager.unregister_notifier(&notifier);
}

#[test]
fn hangup_reports_read_and_hangup() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let (read_end, write_end) = pipe().unwrap();
    let (notifier, seen) = recording_notifier(
        read_end.as_raw_fd(),
        NotificationType::READ | NotificationType::HANG_UP,
    );

    manager.register_notifier(notifier.clone()).unwrap();
    drop(write_end);
    event_loop.pump(PumpMode::WaitForEvents);

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].kind,
        NotificationType::READ | NotificationType::HANG_UP
    );
    drop(events);

    manager.unregister_notifier(&notifier);
}

#[test]
fn observed_readiness_is_masked_by_interest() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let (read_end, write_end) = pipe().unwrap();
    // Watch the read end for writability only: incoming data must not
    // produce an activation.
    let (notifier, seen) = recording_notifier(read_end.as_raw_fd(), NotificationType::WRITE);

    manager.register_notifier(notifier.clone()).unwrap();
    write_byte(&write_end);
    event_loop.pump(PumpMode::DontWait);

    assert_eq!(seen.lock().unwrap().len(), 0);
    manager.unregister_notifier(&notifier);
}

#[test]
fn duplicate_registration_is_rejected() {
    let manager = EventLoopManager::the();
    let (read_end, _write_end) = pipe().unwrap();
    let (first, _) = recording_notifier(read_end.as_raw_fd(), NotificationType::READ);
    let (second, _) = recording_notifier(read_end.as_raw_fd(), NotificationType::READ);

    manager.register_notifier(first.clone()).unwrap();
    let err = manager.register_notifier(second).unwrap_err();
    assert_eq!(
        err,
        EngineError::Notifier(NotifierError::AlreadyRegistered(read_end.as_raw_fd()))
    );

    manager.unregister_notifier(&first);
}

#[test]
fn unregister_is_idempotent_and_safe_cross_thread() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let (read_end, write_end) = pipe().unwrap();
    let (notifier, seen) = recording_notifier(read_end.as_raw_fd(), NotificationType::READ);

    manager.register_notifier(notifier.clone()).unwrap();

    // The owner thread is idle (not polling); another thread may unregister.
    let cross = notifier.clone();
    std::thread::spawn(move || {
        EventLoopManager::the().unregister_notifier(&cross);
    })
    .join()
    .unwrap();

    manager.unregister_notifier(&notifier);

    write_byte(&write_end);
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(seen.lock().unwrap().len(), 0);
}
