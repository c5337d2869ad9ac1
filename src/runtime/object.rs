//! Registry of live async objects.
//!
//! Anything long-lived that owns async work (tasks, listening servers,
//! timers) registers here so a global stop can find and stop it even after
//! its creator has gone out of scope.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::runtime::lock;

/// An entity the runtime must be able to stop during shutdown.
///
/// `stop` is called at least once by the global sweep and possibly also by
/// the owner, so implementations must make it idempotent.
pub trait Object: Send + Sync + 'static {
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

pub type ObjectRef = Arc<dyn Object>;

/// Identity of a shared object: the address of its allocation.
pub fn object_id<T: Object + ?Sized>(object: &Arc<T>) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

#[derive(Default)]
pub struct Registry {
    entries: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    next_seq: u64,
    objects: HashMap<usize, (u64, ObjectRef)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `object`. Returns false if it was already registered.
    pub fn add(&self, object: ObjectRef) -> bool {
        let id = object_id(&object);
        let mut entries = lock(&self.entries);

        if entries.objects.contains_key(&id) {
            return false;
        }
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.objects.insert(id, (seq, object));
        true
    }

    /// Stops tracking `object`. Returns false if it was not registered.
    pub fn remove<T: Object + ?Sized>(&self, object: &Arc<T>) -> bool {
        lock(&self.entries)
            .objects
            .remove(&object_id(object))
            .is_some()
    }

    pub fn remove_id(&self, id: usize) -> bool {
        lock(&self.entries).objects.remove(&id).is_some()
    }

    pub fn contains<T: Object + ?Sized>(&self, object: &Arc<T>) -> bool {
        lock(&self.entries)
            .objects
            .contains_key(&object_id(object))
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the registry, returning objects in registration order.
    pub fn drain(&self) -> Vec<ObjectRef> {
        let mut drained: Vec<(u64, ObjectRef)> = lock(&self.entries)
            .objects
            .drain()
            .map(|(_, entry)| entry)
            .collect();

        drained.sort_by_key(|(seq, _)| *seq);
        drained.into_iter().map(|(_, object)| object).collect()
    }
}
