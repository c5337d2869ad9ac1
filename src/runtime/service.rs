use std::future::Future;
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::runtime::lock;
use crate::runtime::object::{Object, ObjectRef, Registry};
use crate::runtime::pool::{Returned, TaskPool};
use crate::runtime::reactor::{Reactor, on_reactor_thread};
use crate::runtime::task::Task;

/// The process runtime: main reactor, object registry and task pool.
///
/// Construct one at the entry point and hand clones to whatever needs to
/// schedule work; clones share the same runtime. The main reactor starts on
/// [`Service::start`] or on the first scheduling call.
#[derive(Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

/// Non-owning handle, for objects that must reach the service without
/// keeping it alive.
#[derive(Clone)]
pub struct WeakService {
    inner: Weak<Inner>,
}

struct Inner {
    config: RuntimeConfig,
    state: Mutex<State>,
    settled: Condvar,
    reactor: OnceLock<Reactor>,
    objects: Registry,
    tasks: TaskPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    /// Shutdown sweep in progress on the named thread.
    Stopping(ThreadId),
    Stopped,
}

impl Service {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::Idle),
                settled: Condvar::new(),
                reactor: OnceLock::new(),
                objects: Registry::new(),
                tasks: TaskPool::new(),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakService {
        WeakService {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Starts the main reactor thread. A second call is a no-op.
    pub fn start(&self) -> Result<()> {
        self.main_reactor().map(|_| ())
    }

    pub fn is_running(&self) -> bool {
        *lock(&self.inner.state) == State::Running
    }

    /// True once the shutdown sweep has finished.
    pub fn is_stopped(&self) -> bool {
        *lock(&self.inner.state) == State::Stopped
    }

    fn is_closing(&self) -> bool {
        matches!(*lock(&self.inner.state), State::Stopping(_) | State::Stopped)
    }

    /// Stops the main reactor, then every registered object, then every
    /// pooled task. Blocks until those threads have joined. A call racing
    /// an earlier one waits for it to finish, except on a reactor thread
    /// where waiting could deadlock the join.
    pub fn stop(&self) {
        self.inner.stop();
    }

    fn main_reactor(&self) -> Result<&Reactor> {
        let mut state = lock(&self.inner.state);
        match *state {
            State::Stopping(_) | State::Stopped => Err(Error::Stopped),
            State::Running => self.inner.reactor.get().ok_or(Error::Stopped),
            State::Idle => {
                let reactor = Reactor::start(self.inner.config.thread_name.clone())?;
                let reactor = self.inner.reactor.get_or_init(|| reactor);
                *state = State::Running;
                info!(thread = %reactor.name(), "service started");
                Ok(reactor)
            }
        }
    }

    /// Handle of the main reactor's runtime.
    pub fn handle(&self) -> Result<Handle> {
        self.main_reactor().map(|reactor| reactor.handle().clone())
    }

    /// Queues a closure on the main reactor thread.
    ///
    /// Closures submitted from one thread run in submission order.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.main_reactor()?.submit(job)
    }

    /// Spawns a future on the main reactor thread.
    pub fn spawn<F>(&self, future: F) -> Result<tokio::task::JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.main_reactor()?.spawn(future)
    }

    /// Registers an object for the shutdown sweep. Adding twice is a no-op.
    ///
    /// Objects added after the service has stopped are stopped immediately.
    pub fn add(&self, object: ObjectRef) {
        if self.is_closing() {
            debug!(object = object.name(), "service stopped, stopping late object");
            object.stop();
            return;
        }
        self.inner.objects.add(object.clone());

        // Stop began between the check and the insert. Whoever takes the
        // entry out of the registry owns stopping it.
        if self.is_closing() && self.inner.objects.remove(&object) {
            debug!(object = object.name(), "service stopping, stopping late object");
            object.stop();
        }
    }

    pub fn remove<T: Object + ?Sized>(&self, object: &Arc<T>) {
        self.inner.objects.remove(object);
    }

    pub(crate) fn remove_id(&self, id: usize) {
        self.inner.objects.remove_id(id);
    }

    pub fn contains<T: Object + ?Sized>(&self, object: &Arc<T>) -> bool {
        self.inner.objects.contains(object)
    }

    /// Wraps `value` and registers it in one step.
    pub fn new_object<T: Object>(&self, value: T) -> Arc<T> {
        let object = Arc::new(value);
        self.add(object.clone());
        object
    }

    pub fn object_count(&self) -> usize {
        self.inner.objects.len()
    }

    /// Lends out an idle task, building a new one when none is idle.
    ///
    /// The returned task is held by no other caller until it comes back
    /// through [`Service::remove_task`].
    pub fn available_task(&self) -> Result<Arc<Task>> {
        if self.is_closing() {
            return Err(Error::Stopped);
        }

        let (task, stale) = self.inner.tasks.checkout();
        for task in &stale {
            self.inner.objects.remove(task);
        }
        if let Some(task) = task {
            debug!(task = task.id(), "reusing pooled task");
            return Ok(task);
        }

        let task = Arc::new(Task::new(&self.inner.config.task_name)?);
        self.inner.objects.add(task.clone());
        self.inner.tasks.lend(task.clone());

        // Lost a race with stop(): the sweep may have missed this one.
        if self.is_closing() {
            task.stop();
            return Err(Error::Stopped);
        }

        debug!(task = task.id(), "created task");
        Ok(task)
    }

    /// Returns a lent task to the pool. Stopped tasks are dropped from the
    /// pool and the registry instead; unknown tasks are ignored.
    pub fn remove_task(&self, task: &Arc<Task>) {
        match self.inner.tasks.give_back(task) {
            Returned::Reused => debug!(task = task.id(), "task returned to pool"),
            Returned::Discarded => {
                self.inner.objects.remove(task);
                debug!(task = task.id(), "stopped task discarded");
            }
            Returned::Unknown => {}
        }
    }

    pub fn available_tasks(&self) -> usize {
        self.inner.tasks.available_len()
    }

    pub fn runnable_tasks(&self) -> usize {
        self.inner.tasks.runnable_len()
    }

    pub fn tasks_consistent(&self) -> bool {
        self.inner.tasks.is_consistent()
    }
}

impl WeakService {
    pub fn upgrade(&self) -> Option<Service> {
        self.inner.upgrade().map(|inner| Service { inner })
    }
}

impl Inner {
    fn stop(&self) {
        {
            let mut state = lock(&self.state);
            let me = thread::current().id();
            loop {
                let current = *state;
                match current {
                    State::Stopped => return,
                    State::Stopping(owner) if owner == me || on_reactor_thread() => return,
                    State::Stopping(_) => {
                        state = self
                            .settled
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    State::Idle | State::Running => break,
                }
            }
            *state = State::Stopping(me);
        }

        if let Some(reactor) = self.reactor.get() {
            reactor.stop();
        }

        let objects = self.objects.drain();
        let object_count = objects.len();
        for object in objects {
            debug!(object = object.name(), "stopping object");
            object.stop();
        }

        let tasks = self.tasks.drain();
        let task_count = tasks.len();
        for task in tasks {
            task.stop();
        }

        *lock(&self.state) = State::Stopped;
        self.settled.notify_all();
        info!(objects = object_count, tasks = task_count, "service stopped");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop();
    }
}
