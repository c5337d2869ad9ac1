//! Scheduling and lifecycle.
//!
//! The [`Service`] owns a main [`Reactor`](reactor::Reactor), the registry of
//! live [`Object`]s and the pool of reusable [`Task`]s. Work submitted to one
//! reactor runs serially on that reactor's thread; separate reactors run
//! concurrently.
//!
//! ```text
//!   Service ──┬── main reactor (thread)
//!             ├── Registry { objects }      ── lock A
//!             └── TaskPool { available,     ── lock B
//!                            runnable }
//!                    └── Task ── reactor (thread)
//! ```
//!
//! Shutdown order: main reactor, then every registered object, then every
//! pooled task.

pub mod object;
pub mod pool;
pub mod reactor;
pub mod service;
pub mod task;
pub mod timer;

pub use object::{Object, ObjectRef, Registry};
pub use pool::TaskPool;
pub use reactor::Reactor;
pub use service::{Service, WeakService};
pub use task::Task;
pub use timer::Timer;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a holder panicked. The guarded
/// sets stay structurally valid across a panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
