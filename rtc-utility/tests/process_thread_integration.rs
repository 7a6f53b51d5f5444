//! Integration tests for ProcessThread timing and lifecycle behaviour.
//!
//! Modules report every callback over a channel so the tests can assert on
//! the exact sequence the worker produces.

use parking_lot::Mutex;
use rtc_utility::{Module, ModuleId, ProcessThread, ProcessThreadHandle};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Attached(bool),
    TimeUntilNext(i64),
    Process,
}

/// Flags callbacks that run at the same time. Shared between modules to
/// check the worker across all of them.
#[derive(Clone, Default)]
struct CallbackGuard {
    busy: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
}

impl CallbackGuard {
    fn enter(&self) {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    // Callbacks run on the worker, where a failed assert would only abort
    // the run, so the test thread checks instead.
    fn assert_never_overlapped(&self) {
        assert!(
            !self.overlapped.load(Ordering::SeqCst),
            "module callbacks overlapped"
        );
    }
}

/// Module whose delays are scripted. Once the script runs out, it keeps
/// returning `fallback_delay_ms`.
struct ScriptedModule {
    events: Mutex<Sender<(Event, Instant)>>,
    delays: Mutex<VecDeque<i64>>,
    fallback_delay_ms: i64,
    handle: Mutex<Option<ProcessThreadHandle>>,
    guard: CallbackGuard,
    wake_on_attach: AtomicBool,
}

impl ScriptedModule {
    fn new(delays: &[i64], fallback_delay_ms: i64) -> (Arc<Self>, Receiver<(Event, Instant)>) {
        Self::with_guard(delays, fallback_delay_ms, CallbackGuard::default())
    }

    fn with_guard(
        delays: &[i64],
        fallback_delay_ms: i64,
        guard: CallbackGuard,
    ) -> (Arc<Self>, Receiver<(Event, Instant)>) {
        let (tx, rx) = mpsc::channel();
        let module = Arc::new(ScriptedModule {
            events: Mutex::new(tx),
            delays: Mutex::new(delays.iter().copied().collect()),
            fallback_delay_ms,
            handle: Mutex::new(None),
            guard,
            wake_on_attach: AtomicBool::new(false),
        });
        (module, rx)
    }

    fn emit(&self, event: Event) {
        let _ = self.events.lock().send((event, Instant::now()));
    }

    fn handle(&self) -> Option<ProcessThreadHandle> {
        self.handle.lock().clone()
    }
}

impl Module for ScriptedModule {
    fn time_until_next_process(&self) -> i64 {
        self.guard.enter();
        let delay = self
            .delays
            .lock()
            .pop_front()
            .unwrap_or(self.fallback_delay_ms);
        self.emit(Event::TimeUntilNext(delay));
        self.guard.leave();
        delay
    }

    fn process(&self) {
        self.guard.enter();
        self.emit(Event::Process);
        self.guard.leave();
    }

    fn process_thread_attached(&self, process_thread: Option<ProcessThreadHandle>) {
        self.emit(Event::Attached(process_thread.is_some()));
        *self.handle.lock() = process_thread.clone();
        if let Some(handle) = process_thread {
            if self.wake_on_attach.load(Ordering::SeqCst) {
                handle.wake_up();
            }
        }
    }
}

fn next(rx: &Receiver<(Event, Instant)>) -> (Event, Instant) {
    rx.recv_timeout(TIMEOUT).expect("expected a module callback")
}

fn next_event(rx: &Receiver<(Event, Instant)>) -> Event {
    next(rx).0
}

fn assert_quiet(rx: &Receiver<(Event, Instant)>) {
    match rx.recv_timeout(QUIET) {
        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        Ok((event, _)) => panic!("unexpected callback {event:?}"),
    }
}

fn drain(rx: &Receiver<(Event, Instant)>) {
    while rx.recv_timeout(Duration::from_millis(20)).is_ok() {}
}

/// After the detach notification only the tail of a run already executing
/// on the worker may show up.
fn assert_nothing_after_detach(events: &[Event]) {
    let detached_at = events
        .iter()
        .position(|event| *event == Event::Attached(false))
        .expect("module was never detached");
    match &events[detached_at + 1..] {
        [] | [Event::TimeUntilNext(_)] | [Event::Process, Event::TimeUntilNext(_)] => {}
        late => panic!("callbacks after detach: {late:?}"),
    }
}

fn assert_detached_then_quiet(rx: &Receiver<(Event, Instant)>) {
    let mut events = Vec::new();
    while let Ok((event, _)) = rx.recv_timeout(QUIET) {
        events.push(event);
    }
    assert_nothing_after_detach(&events);
    assert_quiet(rx);
}

#[test]
fn test_start_stop_without_modules() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-empty").unwrap();
    pt.start();
    pt.stop();
    pt.stop();
}

#[test]
fn test_registered_module_not_called_before_start() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-before-start").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 0);
    let id = pt.register_module(module);

    assert_quiet(&rx);

    pt.deregister_module(id);
    assert_eq!(next_event(&rx), Event::Attached(false));
}

#[test]
fn test_first_run_only_checks_time() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-first-run").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 60_000);
    let id = pt.register_module(module);
    pt.start();

    assert_eq!(next_event(&rx), Event::Attached(true));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));
    assert_quiet(&rx);

    pt.deregister_module(id);
    pt.stop();
}

#[test]
fn test_register_after_start_attaches_immediately() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-late-register").unwrap();
    pt.start();

    let (module, rx) = ScriptedModule::new(&[0], 60_000);
    let id = pt.register_module(module);

    assert_eq!(next_event(&rx), Event::Attached(true));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(0));
    assert_eq!(next_event(&rx), Event::Process);
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));
    assert_quiet(&rx);

    pt.deregister_module(id);
    pt.stop();
}

#[test]
fn test_negative_delay_is_processed_immediately() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-negative").unwrap();
    let (module, rx) = ScriptedModule::new(&[-5], 60_000);
    pt.register_module(module);
    pt.start();

    assert_eq!(next_event(&rx), Event::Attached(true));
    let (event, checked_at) = next(&rx);
    assert_eq!(event, Event::TimeUntilNext(-5));
    let (event, processed_at) = next(&rx);
    assert_eq!(event, Event::Process);
    assert!(processed_at.duration_since(checked_at) < Duration::from_millis(500));

    pt.stop();
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));
    assert_eq!(next_event(&rx), Event::Attached(false));
}

#[test]
fn test_delays_are_honoured_in_order() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-script").unwrap();
    let (module, rx) = ScriptedModule::new(&[100, 100, -1], 60_000);
    pt.register_module(module);
    let started_at = Instant::now();
    pt.start();

    assert_eq!(next_event(&rx), Event::Attached(true));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(100));

    let (event, first) = next(&rx);
    assert_eq!(event, Event::Process);
    assert!(first.duration_since(started_at) >= Duration::from_millis(100));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(100));

    let (event, second) = next(&rx);
    assert_eq!(event, Event::Process);
    assert!(second.duration_since(first) >= Duration::from_millis(100));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(-1));

    let (event, third) = next(&rx);
    assert_eq!(event, Event::Process);
    assert!(third.duration_since(second) < Duration::from_millis(100));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));
    assert_quiet(&rx);

    pt.stop();
}

#[test]
fn test_wake_up_processes_immediately() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-wake-up").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 60_000);
    let id = pt.register_module(module);
    pt.start();

    assert_eq!(next_event(&rx), Event::Attached(true));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));

    pt.wake_up(id);
    assert_eq!(next_event(&rx), Event::Process);
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));
    assert_quiet(&rx);

    pt.stop();
}

#[test]
fn test_wake_up_through_attachment_handle() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-handle").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 60_000);
    let id: ModuleId = pt.register_module(module.clone());
    pt.start();

    assert_eq!(next_event(&rx), Event::Attached(true));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));

    let handle = module.handle().unwrap();
    assert_eq!(handle.module_id(), id);

    handle.wake_up();
    assert_eq!(next_event(&rx), Event::Process);
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));

    pt.stop();
    assert_eq!(next_event(&rx), Event::Attached(false));
    assert!(module.handle().is_none());
}

#[test]
fn test_repeated_wake_ups_leave_one_live_run() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-many-wakes").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 60_000);
    let id = pt.register_module(module);
    pt.start();
    drain(&rx);

    for _ in 0..5 {
        pt.wake_up(id);
    }

    // Each wake-up invalidates the previous one, but the worker may already
    // be running an earlier run when the next wake-up lands.
    let mut processed = 0;
    while let Ok((event, _)) = rx.recv_timeout(QUIET) {
        if event == Event::Process {
            processed += 1;
        }
    }
    assert!((1..=5).contains(&processed), "processed {processed} times");

    pt.stop();
}

#[test]
fn test_no_process_after_deregister() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-deregister").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 5);
    let id = pt.register_module(module.clone());
    pt.start();

    // Let it tick a few times.
    for _ in 0..3 {
        while next_event(&rx) != Event::Process {}
    }

    pt.deregister_module(id);
    assert_detached_then_quiet(&rx);
    module.guard.assert_never_overlapped();

    pt.stop();
}

#[test]
fn test_wake_up_from_attach_keeps_one_loop() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-attach-wake").unwrap();
    let (at_start, rx_at_start) = ScriptedModule::new(&[], 60_000);
    let (after_start, rx_after_start) = ScriptedModule::new(&[], 60_000);
    at_start.wake_on_attach.store(true, Ordering::SeqCst);
    after_start.wake_on_attach.store(true, Ordering::SeqCst);

    pt.register_module(at_start);
    pt.start();
    pt.register_module(after_start);

    // The woken run replaces the check-only one.
    for rx in [&rx_at_start, &rx_after_start] {
        assert_eq!(next_event(rx), Event::Attached(true));
        assert_eq!(next_event(rx), Event::Process);
        assert_eq!(next_event(rx), Event::TimeUntilNext(60_000));
        assert_quiet(rx);
    }

    pt.stop();
}

#[test]
fn test_wake_up_from_attach_keeps_period() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-attach-period").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 200);
    module.wake_on_attach.store(true, Ordering::SeqCst);
    pt.register_module(module);
    pt.start();

    let started = Instant::now();
    let mut processed = 0;
    while started.elapsed() < Duration::from_millis(1050) {
        if let Ok((Event::Process, _)) = rx.recv_timeout(Duration::from_millis(10)) {
            processed += 1;
        }
    }
    // One loop at 200ms processes at 0, 200, .., 1000ms.
    assert!((4..=7).contains(&processed), "processed {processed} times");

    pt.stop();
}

#[test]
fn test_concurrent_registration_and_wake_ups() {
    let _ = env_logger::builder().is_test(true).try_init();

    const THREADS: usize = 4;
    const ROUNDS: usize = 25;

    let pt = ProcessThread::new("it-concurrent").unwrap();
    let guard = CallbackGuard::default();
    // A resident module keeps the worker busy throughout.
    let (resident, rx_resident) = ScriptedModule::with_guard(&[], 1, guard.clone());
    let resident_id = pt.register_module(resident);
    pt.start();

    let receivers: Vec<Receiver<(Event, Instant)>> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let pt = &pt;
                let guard = guard.clone();
                s.spawn(move || {
                    let mut receivers = Vec::with_capacity(ROUNDS);
                    for round in 0..ROUNDS {
                        let (module, rx) =
                            ScriptedModule::with_guard(&[], (round % 3) as i64, guard.clone());
                        let id = pt.register_module(module.clone());
                        pt.wake_up(id);
                        if let Some(handle) = module.handle() {
                            handle.wake_up();
                        }
                        pt.deregister_module(id);
                        receivers.push(rx);
                    }
                    receivers
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect()
    });

    pt.deregister_module(resident_id);
    assert_detached_then_quiet(&rx_resident);

    let received = |rx: &Receiver<(Event, Instant)>| -> Vec<Event> {
        rx.try_iter().map(|(event, _)| event).collect()
    };
    for rx in &receivers {
        assert_nothing_after_detach(&received(rx));
    }
    std::thread::sleep(QUIET);
    for rx in &receivers {
        assert_eq!(received(rx), Vec::new());
    }
    guard.assert_never_overlapped();

    pt.stop();
}

#[test]
fn test_no_process_after_stop() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-stop").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 5);
    pt.register_module(module);
    pt.start();

    while next_event(&rx) != Event::Process {}

    pt.stop();
    drain(&rx);
    assert_quiet(&rx);
}

#[test]
fn test_restart_requires_registering_again() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-restart").unwrap();
    let (module, rx) = ScriptedModule::new(&[], 60_000);
    pt.register_module(module.clone());
    pt.start();
    pt.stop();
    drain(&rx);

    // Stop emptied the registry.
    pt.start();
    assert_quiet(&rx);

    pt.register_module(module);
    assert_eq!(next_event(&rx), Event::Attached(true));
    assert_eq!(next_event(&rx), Event::TimeUntilNext(60_000));

    pt.stop();
}

#[test]
fn test_modules_share_one_worker() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pt = ProcessThread::new("it-two").unwrap();
    let (first, rx_first) = ScriptedModule::new(&[0, 0, 0], 60_000);
    let (second, rx_second) = ScriptedModule::new(&[0, 0, 0], 60_000);
    pt.register_module(first);
    pt.register_module(second);
    pt.start();

    let processes = |rx: &Receiver<(Event, Instant)>| {
        let mut n = 0;
        while let Ok((event, _)) = rx.recv_timeout(QUIET) {
            if event == Event::Process {
                n += 1;
            }
        }
        n
    };
    assert_eq!(processes(&rx_first), 3);
    assert_eq!(processes(&rx_second), 3);

    pt.stop();
}
