use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::error::Result;
use crate::runtime::lock;
use crate::runtime::object::Object;
use crate::runtime::service::{Service, WeakService};

/// One-shot deadline running on the main reactor.
///
/// The callback fires once after `delay` unless the timer is stopped first.
/// There are no implicit timeouts anywhere else in the runtime; callers
/// bound long async chains by stopping the relevant context from here.
pub struct Timer {
    delay: Duration,
    fired: AtomicBool,
    stopped: AtomicBool,
    abort: Mutex<Option<AbortHandle>>,
    service: WeakService,
}

impl Timer {
    pub fn after<F>(service: &Service, delay: Duration, callback: F) -> Result<Arc<Timer>>
    where
        F: FnOnce() + Send + 'static,
    {
        let timer = service.new_object(Timer {
            delay,
            fired: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            abort: Mutex::new(None),
            service: service.downgrade(),
        });

        let armed = timer.clone();
        let spawned = service.spawn(async move {
            tokio::time::sleep(armed.delay).await;
            if armed.stopped.swap(true, Ordering::AcqRel) {
                return;
            }
            armed.fired.store(true, Ordering::Release);
            debug!(delay_ms = armed.delay.as_millis() as u64, "timer fired");
            callback();
            armed.unregister();
        });

        match spawned {
            Ok(handle) => {
                *lock(&timer.abort) = Some(handle.abort_handle());
                Ok(timer)
            }
            Err(e) => {
                service.remove(&timer);
                Err(e)
            }
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// True once the callback has run.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    fn unregister(self: &Arc<Self>) {
        if let Some(service) = self.service.upgrade() {
            service.remove(self);
        }
    }
}

impl Object for Timer {
    fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(abort) = lock(&self.abort).take() {
            abort.abort();
        }
        if let Some(service) = self.service.upgrade() {
            // Registry identity is the allocation address, which `self` shares.
            service.remove_id(self as *const Timer as *const () as usize);
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
