use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;

use crate::error::Result;
use crate::runtime::object::Object;
use crate::runtime::reactor::Reactor;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A reusable execution context: its own reactor on its own thread.
///
/// The thread starts as soon as the task is built. Work submitted to a
/// task never competes with the service's main reactor or other tasks.
/// A stopped task is never restarted; the pool replaces it instead.
pub struct Task {
    id: u64,
    reactor: Reactor,
}

impl Task {
    pub fn new(prefix: &str) -> std::io::Result<Self> {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let reactor = Reactor::start(format!("{}-{}", prefix, id))?;

        Ok(Self { id, reactor })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    pub fn handle(&self) -> &Handle {
        self.reactor.handle()
    }

    pub fn is_current(&self) -> bool {
        self.reactor.is_current()
    }

    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.reactor.submit(job)
    }

    pub fn spawn<F>(&self, future: F) -> Result<tokio::task::JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.reactor.spawn(future)
    }

    /// Stopped, or on its way there; either way not fit for reuse.
    pub(crate) fn is_retired(&self) -> bool {
        self.reactor.is_closing()
    }
}

impl Object for Task {
    /// Blocks until the task thread has exited.
    fn stop(&self) {
        self.reactor.stop();
    }

    fn is_stopped(&self) -> bool {
        self.reactor.is_stopped()
    }

    fn name(&self) -> &str {
        self.reactor.name()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
