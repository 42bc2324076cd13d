/*!
 * Timer Tests
 * Firing windows, periodic coalescing, visibility policies, unregister
 */

use evmux::{Event, EventLoopManager, EventReceiver, FireWhenInvisible, PumpMode};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CountingReceiver {
    timer_events: AtomicUsize,
    visible: AtomicBool,
}

impl CountingReceiver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            timer_events: AtomicUsize::new(0),
            visible: AtomicBool::new(true),
        })
    }

    fn count(&self) -> usize {
        self.timer_events.load(Ordering::SeqCst)
    }

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }
}

impl EventReceiver for CountingReceiver {
    fn handle_event(&self, event: Event) {
        if matches!(event, Event::Timer) {
            self.timer_events.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_visible_for_timers(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

/// Pump until the receiver saw `target` events or `deadline` passes.
fn pump_until(
    event_loop: &evmux::EventLoop,
    receiver: &CountingReceiver,
    target: usize,
    deadline: Duration,
) {
    let started = Instant::now();
    while receiver.count() < target && started.elapsed() < deadline {
        event_loop.pump(PumpMode::WaitForEvents);
    }
}

#[test]
fn one_shot_timer_fires_once_within_window() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let receiver = CountingReceiver::new();

    let started = Instant::now();
    let id = manager.register_timer(&receiver, 50, false, FireWhenInvisible::No);
    pump_until(&event_loop, &receiver, 1, Duration::from_secs(2));

    assert_eq!(receiver.count(), 1);
    assert!(started.elapsed() >= Duration::from_millis(50));

    event_loop.pump(PumpMode::DontWait);
    assert_eq!(receiver.count(), 1);
    manager.unregister_timer(id);
}

#[test]
fn timer_does_not_fire_before_interval() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let receiver = CountingReceiver::new();

    let id = manager.register_timer(&receiver, 80, false, FireWhenInvisible::No);
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(receiver.count(), 0);

    std::thread::sleep(Duration::from_millis(20));
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(receiver.count(), 0);

    manager.unregister_timer(id);
}

#[test]
fn periodic_timer_skips_missed_ticks_after_stall() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let receiver = CountingReceiver::new();

    let id = manager.register_timer(&receiver, 10, true, FireWhenInvisible::No);
    pump_until(&event_loop, &receiver, 1, Duration::from_secs(2));
    let before_stall = receiver.count();

    // Stall the loop for ~10 intervals. A single pass afterwards fires the
    // timer once and re-anchors it; the missed ticks are not replayed.
    std::thread::sleep(Duration::from_millis(100));
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(receiver.count(), before_stall + 1);

    manager.unregister_timer(id);
}

#[test]
fn zero_interval_periodic_fires_once_per_iteration() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let receiver = CountingReceiver::new();

    let id = manager.register_timer(&receiver, 0, true, FireWhenInvisible::No);
    for expected in 1..=5 {
        let processed = event_loop.pump(PumpMode::DontWait);
        assert_eq!(processed, 1);
        assert_eq!(receiver.count(), expected);
    }

    manager.unregister_timer(id);
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(receiver.count(), 5);
}

#[test]
fn unregister_timer_is_idempotent() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let receiver = CountingReceiver::new();

    let id = manager.register_timer(&receiver, 30, false, FireWhenInvisible::No);
    let second_handle = id.clone();
    manager.unregister_timer(id);
    manager.unregister_timer(second_handle);

    std::thread::sleep(Duration::from_millis(50));
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(receiver.count(), 0);
}

#[test]
fn hidden_receiver_only_gets_events_allowed_by_policy() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();

    let hidden_no = CountingReceiver::new();
    hidden_no.set_visible(false);
    let hidden_yes = CountingReceiver::new();
    hidden_yes.set_visible(false);
    let visible_never = CountingReceiver::new();

    let a = manager.register_timer(&hidden_no, 10, false, FireWhenInvisible::No);
    let b = manager.register_timer(&hidden_yes, 10, false, FireWhenInvisible::Yes);
    let c = manager.register_timer(&visible_never, 10, false, FireWhenInvisible::Never);

    std::thread::sleep(Duration::from_millis(30));
    event_loop.pump(PumpMode::DontWait);

    assert_eq!(hidden_no.count(), 0);
    assert_eq!(hidden_yes.count(), 1);
    assert_eq!(visible_never.count(), 0);

    manager.unregister_timer(a);
    manager.unregister_timer(b);
    manager.unregister_timer(c);
}

#[test]
fn hidden_receiver_resumes_delivery_when_visible() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let receiver = CountingReceiver::new();
    receiver.set_visible(false);

    let id = manager.register_timer(&receiver, 10, true, FireWhenInvisible::No);
    std::thread::sleep(Duration::from_millis(20));
    event_loop.pump(PumpMode::DontWait);
    assert_eq!(receiver.count(), 0);

    receiver.set_visible(true);
    pump_until(&event_loop, &receiver, 1, Duration::from_secs(2));
    assert_eq!(receiver.count(), 1);

    manager.unregister_timer(id);
}

#[test]
fn dropping_receiver_silences_timer() {
    let manager = EventLoopManager::the();
    let event_loop = manager.make_implementation();
    let receiver = CountingReceiver::new();

    let id = manager.register_timer(&receiver, 10, true, FireWhenInvisible::No);
    drop(receiver);

    // The weak owner is gone: the timer fires into nothing, does not
    // reschedule, and later pumps stay quiet.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(event_loop.pump(PumpMode::DontWait), 0);
    assert_eq!(event_loop.pump(PumpMode::DontWait), 0);

    manager.unregister_timer(id);
}
