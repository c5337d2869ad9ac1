//! Available/runnable bookkeeping for pooled tasks.
//!
//! A task lives in exactly one of the two sets: `available` while idle,
//! `runnable` while lent to a caller. Both sets sit behind one lock, separate
//! from the object registry's.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::runtime::lock;
use crate::runtime::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returned {
    /// Back in the available set.
    Reused,
    /// The task had been stopped; dropped from the pool.
    Discarded,
    /// Not currently lent out; nothing changed.
    Unknown,
}

#[derive(Default)]
pub struct TaskPool {
    sets: Mutex<Sets>,
}

#[derive(Default)]
struct Sets {
    available: Vec<Arc<Task>>,
    runnable: HashMap<u64, Arc<Task>>,
}

impl TaskPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves an idle task to the runnable set.
    ///
    /// Idle tasks found stopped are dropped from the pool and returned as the
    /// second element so the caller can unregister them.
    pub fn checkout(&self) -> (Option<Arc<Task>>, Vec<Arc<Task>>) {
        let mut sets = lock(&self.sets);
        let mut stale = Vec::new();

        while let Some(task) = sets.available.pop() {
            if task.is_retired() {
                stale.push(task);
                continue;
            }
            sets.runnable.insert(task.id(), task.clone());
            return (Some(task), stale);
        }

        (None, stale)
    }

    /// Records a freshly built task as lent out.
    pub fn lend(&self, task: Arc<Task>) {
        lock(&self.sets).runnable.insert(task.id(), task);
    }

    pub fn give_back(&self, task: &Arc<Task>) -> Returned {
        let mut sets = lock(&self.sets);

        if sets.runnable.remove(&task.id()).is_none() {
            return Returned::Unknown;
        }
        if task.is_retired() {
            return Returned::Discarded;
        }
        sets.available.push(task.clone());
        Returned::Reused
    }

    /// Empties both sets.
    pub fn drain(&self) -> Vec<Arc<Task>> {
        let mut sets = lock(&self.sets);
        let mut tasks: Vec<Arc<Task>> = sets.available.drain(..).collect();
        tasks.extend(sets.runnable.drain().map(|(_, task)| task));
        tasks
    }

    pub fn available_len(&self) -> usize {
        lock(&self.sets).available.len()
    }

    pub fn runnable_len(&self) -> usize {
        lock(&self.sets).runnable.len()
    }

    /// True when no task sits in both sets.
    pub fn is_consistent(&self) -> bool {
        let sets = lock(&self.sets);
        sets.available
            .iter()
            .all(|task| !sets.runnable.contains_key(&task.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::object::Object;

    #[test]
    fn give_back_twice_is_a_noop() {
        let pool = TaskPool::new();
        let task = Arc::new(Task::new("pool-test").unwrap());

        pool.lend(task.clone());
        assert_eq!(pool.give_back(&task), Returned::Reused);
        assert_eq!(pool.give_back(&task), Returned::Unknown);
        assert_eq!(pool.available_len(), 1);
        assert_eq!(pool.runnable_len(), 0);

        task.stop();
    }

    #[test]
    fn stopped_tasks_are_not_handed_out() {
        let pool = TaskPool::new();
        let task = Arc::new(Task::new("pool-stale").unwrap());

        pool.lend(task.clone());
        pool.give_back(&task);
        task.stop();

        let (found, stale) = pool.checkout();
        assert!(found.is_none());
        assert_eq!(stale.len(), 1);
        assert!(pool.is_consistent());
    }
}
