use crate::module::{Module, ModuleId};
use crate::task_queue::{TaskQueue, TaskQueueHandle};
use log::{debug, error, trace};
use parking_lot::ReentrantMutex;
use shared::error::Result;
use std::cell::RefCell;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Drives registered [`Module`]s on a single dedicated worker thread.
///
/// Every registered module has at most one live scheduled run queued at a
/// time. When a run fires it calls [`Module::process`] (unless it is a
/// check-only run), then asks the module for its next delay and queues the
/// next run. [`ProcessThread::wake_up`] replaces the queued run with an
/// immediate one.
///
/// `start` and `stop` must be called from the owning thread. Everything
/// else may be called from any thread, including from inside module
/// callbacks.
pub struct ProcessThread {
    inner: Arc<ProcessThreadInner>,
    // Declared after `inner`: pending runs are dropped with the worker.
    task_queue: TaskQueue,
}

/// Attachment handle given to a module through
/// [`Module::process_thread_attached`].
///
/// It does not keep the process thread alive. Once the module has been
/// deregistered, or the thread stopped, calls through a stale handle are
/// ignored.
#[derive(Clone)]
pub struct ProcessThreadHandle {
    inner: Weak<ProcessThreadInner>,
    module_id: ModuleId,
}

struct ProcessThreadInner {
    name: String,
    queue: TaskQueueHandle,
    // Reentrant so module callbacks invoked under the lock may call back in.
    // The RefCell borrow is never held across a callback.
    state: ReentrantMutex<RefCell<State>>,
}

#[derive(Default)]
struct State {
    started: bool,
    next_module_id: u64,
    modules: Vec<ModuleCallback>,
}

struct ModuleCallback {
    id: ModuleId,
    module: Arc<dyn Module>,
    location: &'static Location<'static>,
    /// Bumped whenever the module's queued run must be invalidated. A run
    /// is live only while its own generation still matches this value.
    generation: Arc<AtomicU64>,
}

/// One queued run of a module on the worker thread.
struct ModuleTask {
    queue: TaskQueueHandle,
    module_id: ModuleId,
    module: Arc<dyn Module>,
    schedule: Arc<AtomicU64>,
    generation: u64,
    /// When set, the run only asks for the next delay without processing.
    check_time: bool,
}

impl ModuleTask {
    fn is_cancelled(&self) -> bool {
        self.schedule.load(Ordering::Acquire) != self.generation
    }

    fn run(mut self) {
        if self.is_cancelled() {
            trace!("dropping cancelled run of {}", self.module_id);
            return;
        }

        if !self.check_time {
            self.module.process();
        }
        let time_until_next_ms = self.module.time_until_next_process();
        self.check_time = false;

        self.post_after(time_until_next_ms);
    }

    fn post_now(self) {
        let queue = self.queue.clone();
        queue.post_task(move || self.run());
    }

    fn post_after(self, time_until_next_ms: i64) {
        if time_until_next_ms <= 0 {
            self.post_now();
        } else {
            let queue = self.queue.clone();
            queue.post_delayed_task(
                move || self.run(),
                Duration::from_millis(time_until_next_ms as u64),
            );
        }
    }
}

/// Invalidates every queued run of a module and returns the new generation.
fn cancel(generation: &AtomicU64) -> u64 {
    generation.fetch_add(1, Ordering::AcqRel) + 1
}

impl ProcessThread {
    /// Creates the worker thread, named `thread_name`. Modules are not
    /// driven until [`start`](Self::start) is called.
    pub fn new(thread_name: &str) -> Result<Self> {
        let task_queue = TaskQueue::new(thread_name)?;
        let inner = Arc::new(ProcessThreadInner {
            name: thread_name.to_owned(),
            queue: task_queue.handle(),
            state: ReentrantMutex::new(RefCell::new(State::default())),
        });

        Ok(ProcessThread { inner, task_queue })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Starts driving every registered module. Each module is notified of
    /// the attachment and gets a check-only run queued.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Stops driving modules. Every module is notified of the detachment and
    /// the registry is emptied. Calling `stop` on a stopped thread is a
    /// no-op.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Registers `module` and returns its id. If the thread is started the
    /// module is attached and a check-only run is queued right away.
    ///
    /// Registering the same module twice is a programming error.
    #[track_caller]
    pub fn register_module(&self, module: Arc<dyn Module>) -> ModuleId {
        self.inner.register_module(module, Location::caller())
    }

    /// Removes the module, invalidates its queued run and notifies it of the
    /// detachment. Unknown ids are ignored.
    ///
    /// A run already executing on the worker is not waited for.
    pub fn deregister_module(&self, module_id: ModuleId) {
        self.inner.deregister_module(module_id);
    }

    /// Replaces the module's queued run with one that processes it
    /// immediately.
    ///
    /// The module must be registered and the thread started.
    pub fn wake_up(&self, module_id: ModuleId) {
        let woken = self.inner.wake_up(module_id);
        debug_assert!(woken, "wake_up for {module_id} which is not running");
    }
}

impl Drop for ProcessThread {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let guard = self.inner.state.lock();
            debug_assert!(
                !guard.borrow().started,
                "process thread {} dropped without stop",
                self.inner.name
            );
        }
        debug!("process thread {} dropped", self.task_queue.name());
    }
}

impl ProcessThreadInner {
    fn handle_for(self: &Arc<Self>, module_id: ModuleId) -> ProcessThreadHandle {
        ProcessThreadHandle {
            inner: Arc::downgrade(self),
            module_id,
        }
    }

    fn new_task(
        &self,
        module_id: ModuleId,
        module: Arc<dyn Module>,
        schedule: Arc<AtomicU64>,
        generation: u64,
        check_time: bool,
    ) -> ModuleTask {
        ModuleTask {
            queue: self.queue.clone(),
            module_id,
            module,
            schedule,
            generation,
            check_time,
        }
    }

    fn start(self: &Arc<Self>) {
        let guard = self.state.lock();

        let modules: Vec<(ModuleId, Arc<dyn Module>, Arc<AtomicU64>)> = {
            let mut state = guard.borrow_mut();
            debug_assert!(!state.started, "process thread {} started twice", self.name);
            if state.started {
                return;
            }
            state.started = true;
            state
                .modules
                .iter()
                .map(|m| (m.id, Arc::clone(&m.module), Arc::clone(&m.generation)))
                .collect()
        };

        debug!(
            "process thread {} starting with {} module(s)",
            self.name,
            modules.len()
        );

        for (module_id, module, schedule) in modules {
            // A wake-up issued from the attach callback supersedes this run.
            let generation = schedule.load(Ordering::Acquire);
            module.process_thread_attached(Some(self.handle_for(module_id)));
            self.new_task(module_id, module, schedule, generation, true)
                .post_now();
        }
    }

    fn stop(&self) {
        let guard = self.state.lock();

        let modules: Vec<ModuleCallback> = {
            let mut state = guard.borrow_mut();
            if !state.started {
                return;
            }
            state.started = false;
            state.modules.drain(..).collect()
        };

        debug!(
            "process thread {} stopping, detaching {} module(s)",
            self.name,
            modules.len()
        );

        for m in modules {
            cancel(&m.generation);
            m.module.process_thread_attached(None);
        }
    }

    fn register_module(
        self: &Arc<Self>,
        module: Arc<dyn Module>,
        location: &'static Location<'static>,
    ) -> ModuleId {
        let guard = self.state.lock();

        let (module_id, schedule, started) = {
            let mut state = guard.borrow_mut();

            if cfg!(debug_assertions) {
                if let Some(existing) = state
                    .modules
                    .iter()
                    .find(|m| std::ptr::addr_eq(Arc::as_ptr(&m.module), Arc::as_ptr(&module)))
                {
                    panic!(
                        "module already registered as {} from {}, registering again from {}",
                        existing.id, existing.location, location
                    );
                }
            }

            let module_id = ModuleId(state.next_module_id);
            state.next_module_id += 1;

            let schedule = Arc::new(AtomicU64::new(0));
            state.modules.push(ModuleCallback {
                id: module_id,
                module: Arc::clone(&module),
                location,
                generation: Arc::clone(&schedule),
            });
            (module_id, schedule, state.started)
        };

        debug!(
            "process thread {}: registered {module_id} from {location}",
            self.name
        );

        if started {
            let generation = schedule.load(Ordering::Acquire);
            module.process_thread_attached(Some(self.handle_for(module_id)));
            self.new_task(module_id, module, schedule, generation, true)
                .post_now();
        }

        module_id
    }

    fn deregister_module(&self, module_id: ModuleId) {
        let guard = self.state.lock();

        let removed = {
            let mut state = guard.borrow_mut();
            state
                .modules
                .iter()
                .position(|m| m.id == module_id)
                .map(|index| state.modules.remove(index))
        };

        let Some(m) = removed else {
            trace!(
                "process thread {}: deregister of unknown {module_id}",
                self.name
            );
            return;
        };

        cancel(&m.generation);
        m.module.process_thread_attached(None);

        debug!(
            "process thread {}: deregistered {module_id} (registered from {})",
            self.name, m.location
        );
    }

    /// Returns false if the module is unknown or the thread is not started.
    fn wake_up(&self, module_id: ModuleId) -> bool {
        let guard = self.state.lock();

        let task = {
            let state = guard.borrow();
            if !state.started {
                None
            } else {
                state.modules.iter().find(|m| m.id == module_id).map(|m| {
                    let generation = cancel(&m.generation);
                    self.new_task(
                        module_id,
                        Arc::clone(&m.module),
                        Arc::clone(&m.generation),
                        generation,
                        false,
                    )
                })
            }
        };

        match task {
            Some(task) => {
                trace!("process thread {}: waking up {module_id}", self.name);
                task.post_now();
                true
            }
            None => {
                error!(
                    "process thread {}: cannot wake up {module_id}, not running",
                    self.name
                );
                false
            }
        }
    }
}

impl ProcessThreadHandle {
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    /// Asks the worker to process the module immediately. Ignored if the
    /// process thread is gone or the module is no longer running on it.
    pub fn wake_up(&self) {
        if let Some(inner) = self.inner.upgrade() {
            let guard = inner.state.lock();
            let running = {
                let state = guard.borrow();
                state.started && state.modules.iter().any(|m| m.id == self.module_id)
            };
            if running {
                inner.wake_up(self.module_id);
            } else {
                trace!("stale handle for {} ignored", self.module_id);
            }
        }
    }

    /// Deregisters the module this handle was issued for.
    pub fn deregister(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.deregister_module(self.module_id);
        }
    }
}

impl std::fmt::Debug for ProcessThreadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessThreadHandle")
            .field("module_id", &self.module_id)
            .finish()
    }
}
