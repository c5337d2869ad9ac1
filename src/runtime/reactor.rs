//! A single-threaded event loop pinned to its own OS thread.
//!
//! Each reactor owns a current-thread tokio runtime driven from a dedicated,
//! named thread. Closures submitted through [`Reactor::submit`] run on that
//! thread in submission order; futures handed to [`Reactor::spawn`] are
//! polled by the same thread between closures. The open job queue keeps the
//! loop alive while there is nothing to do.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{JoinHandle, ThreadId};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::runtime::lock;

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static ON_REACTOR: Cell<bool> = const { Cell::new(false) };
}

/// True on any reactor loop thread.
pub(crate) fn on_reactor_thread() -> bool {
    ON_REACTOR.with(Cell::get)
}

pub struct Reactor {
    name: String,
    handle: Handle,
    jobs: mpsc::UnboundedSender<Job>,
    thread_id: ThreadId,
    /// Set once stop begins; refuses new work.
    closing: AtomicBool,
    /// Set once the loop thread has dropped its runtime.
    stopped: Arc<AtomicBool>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Reactor {
    /// Builds the runtime and starts the loop thread.
    pub fn start(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

        let stopped = Arc::new(AtomicBool::new(false));
        let exited = stopped.clone();
        let thread_name = name.clone();
        let thread = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                ON_REACTOR.with(|flag| flag.set(true));
                let loop_name = thread_name.clone();
                runtime.block_on(async move {
                    loop {
                        tokio::select! {
                            biased;
                            _ = &mut shutdown_rx => break,
                            job = queue.recv() => match job {
                                Some(job) => run_job(&loop_name, job),
                                None => break,
                            },
                        }
                    }
                });
                // Dropping the runtime here abandons every future that has
                // not completed yet.
                drop(runtime);
                exited.store(true, Ordering::Release);
                debug!(reactor = %thread_name, "reactor loop exited");
            })?;

        let thread_id = thread.thread().id();
        debug!(reactor = %name, "reactor started");

        Ok(Self {
            name,
            handle,
            jobs,
            thread_id,
            closing: AtomicBool::new(false),
            stopped,
            shutdown: Mutex::new(Some(shutdown)),
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime handle for this reactor.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// True when called from the loop thread itself.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// True once the loop thread has finished and its runtime is gone.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// True once stop has begun, even if the thread is still unwinding.
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Queues a closure to run on the loop thread.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closing() {
            return Err(Error::Stopped);
        }
        self.jobs.send(Box::new(job)).map_err(|_| Error::Stopped)
    }

    /// Spawns a future onto the loop thread.
    pub fn spawn<F>(&self, future: F) -> Result<tokio::task::JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_closing() {
            return Err(Error::Stopped);
        }
        Ok(self.handle.spawn(future))
    }

    /// Stops the loop and joins its thread.
    ///
    /// Pending work is abandoned. Every caller returns only after the thread
    /// has been joined, so a second concurrent call waits for the first. When
    /// called from the loop thread the thread is signalled but not joined; it
    /// exits once the current job returns.
    pub fn stop(&self) {
        self.closing.store(true, Ordering::Release);

        if let Some(shutdown) = lock(&self.shutdown).take() {
            // The loop may already be gone if its thread panicked.
            let _ = shutdown.send(());
        }

        if self.is_current() {
            warn!(reactor = %self.name, "reactor stopped from its own thread, not joining");
            return;
        }

        // Held across the join so concurrent callers queue behind it.
        let mut thread = lock(&self.thread);
        let Some(handle) = thread.take() else {
            return;
        };
        if handle.join().is_err() {
            error!(reactor = %self.name, "reactor thread panicked");
        }
        self.stopped.store(true, Ordering::Release);
        debug!(reactor = %self.name, "reactor stopped");
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_job(reactor: &str, job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!(reactor = %reactor, "job panicked");
    }
}
