use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use spindle::config::RuntimeConfig;
use spindle::{Error, Object, Service, Timer};

const WAIT: Duration = Duration::from_secs(5);

fn service() -> Service {
    Service::new(RuntimeConfig::default())
}

#[derive(Default)]
struct Tracked {
    stopped: AtomicBool,
    stop_calls: AtomicUsize,
}

impl Object for Tracked {
    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[test]
fn test_service_start_is_idempotent() {
    let service = service();
    assert!(!service.is_running());

    service.start().unwrap();
    service.start().unwrap();
    assert!(service.is_running());

    service.stop();
}

#[test]
fn test_service_stop_is_idempotent() {
    let service = service();
    service.start().unwrap();

    service.stop();
    service.stop();
    assert!(service.is_stopped());
    assert!(!service.is_running());
}

#[test]
fn test_service_stop_without_start() {
    let service = service();
    service.stop();

    assert!(service.is_stopped());
    assert!(matches!(service.start(), Err(Error::Stopped)));
}

#[test]
fn test_submitted_jobs_run_in_order() {
    let service = service();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for label in ["A", "B", "C"] {
        let seen = seen.clone();
        service
            .submit(move || seen.lock().unwrap().push(label))
            .unwrap();
    }

    let (tx, rx) = mpsc::channel();
    service.submit(move || tx.send(()).unwrap()).unwrap();
    rx.recv_timeout(WAIT).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["A", "B", "C"]);
    service.stop();
}

#[test]
fn test_jobs_run_off_the_caller_thread() {
    let service = service();
    let caller = thread::current().id();

    let (tx, rx) = mpsc::channel();
    service
        .submit(move || tx.send(thread::current().id()).unwrap())
        .unwrap();

    assert_ne!(rx.recv_timeout(WAIT).unwrap(), caller);
    service.stop();
}

#[test]
fn test_submit_after_stop_fails() {
    let service = service();
    service.start().unwrap();
    service.stop();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let result = service.submit(move || flag.store(true, Ordering::SeqCst));

    assert!(matches!(result, Err(Error::Stopped)));
    assert!(service.spawn(async {}).is_err());
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn test_stop_sweeps_every_registered_object() {
    let service = service();
    let objects: Vec<Arc<Tracked>> = (0..3).map(|_| service.new_object(Tracked::default())).collect();
    assert_eq!(service.object_count(), 3);

    // An owner stopping its object early must not break the sweep.
    objects[1].stop();

    service.stop();

    for object in &objects {
        assert!(object.is_stopped());
        assert!(!service.contains(object));
    }
    assert_eq!(objects[0].stop_calls.load(Ordering::SeqCst), 1);
    assert_eq!(objects[1].stop_calls.load(Ordering::SeqCst), 2);
    assert_eq!(service.object_count(), 0);
}

#[test]
fn test_add_is_idempotent_and_remove_skips_sweep() {
    let service = service();
    let kept = Arc::new(Tracked::default());
    let removed = Arc::new(Tracked::default());

    service.add(kept.clone());
    service.add(kept.clone());
    service.add(removed.clone());
    assert_eq!(service.object_count(), 2);

    service.remove(&removed);
    service.remove(&removed);
    service.stop();

    assert_eq!(kept.stop_calls.load(Ordering::SeqCst), 1);
    assert!(!removed.is_stopped());
}

#[test]
fn test_object_added_after_stop_is_stopped() {
    let service = service();
    service.stop();

    let late = service.new_object(Tracked::default());
    assert!(late.is_stopped());
    assert!(!service.contains(&late));
}

#[test]
fn test_objects_added_while_stopping_are_all_stopped() {
    for _ in 0..50 {
        let service = service();
        service.start().unwrap();

        let adder = {
            let service = service.clone();
            thread::spawn(move || {
                (0..64)
                    .map(|_| service.new_object(Tracked::default()))
                    .collect::<Vec<_>>()
            })
        };
        thread::yield_now();
        service.stop();

        for object in adder.join().unwrap() {
            assert!(object.is_stopped());
            assert_eq!(object.stop_calls.load(Ordering::SeqCst), 1);
            assert!(!service.contains(&object));
        }
        assert_eq!(service.object_count(), 0);
    }
}

#[derive(Default)]
struct SlowStop {
    stopped: AtomicBool,
}

impl Object for SlowStop {
    fn stop(&self) {
        thread::sleep(Duration::from_millis(300));
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[test]
fn test_second_stop_waits_for_the_first() {
    let service = service();
    let slow = service.new_object(SlowStop::default());
    let task = service.available_task().unwrap();
    task.submit(|| thread::sleep(Duration::from_millis(200)))
        .unwrap();

    let first = {
        let service = service.clone();
        thread::spawn(move || service.stop())
    };
    thread::sleep(Duration::from_millis(50));
    service.stop();

    assert!(service.is_stopped());
    assert!(slow.is_stopped());
    assert!(task.is_stopped());
    first.join().unwrap();
}

#[test]
fn test_available_task_runs_on_its_own_thread() {
    let service = service();
    let task = service.available_task().unwrap();
    assert_eq!(service.runnable_tasks(), 1);

    let (tx, rx) = mpsc::channel();
    service
        .submit(move || tx.send(thread::current().id()).unwrap())
        .unwrap();
    let main_thread = rx.recv_timeout(WAIT).unwrap();

    let (tx, rx) = mpsc::channel();
    task.submit(move || tx.send(thread::current().id()).unwrap())
        .unwrap();
    let task_thread = rx.recv_timeout(WAIT).unwrap();
    assert_ne!(main_thread, task_thread);

    service.remove_task(&task);
    assert_eq!(service.runnable_tasks(), 0);
    assert_eq!(service.available_tasks(), 1);

    // Returned tasks are reused.
    let again = service.available_task().unwrap();
    assert_eq!(again.id(), task.id());
    service.remove_task(&again);

    service.stop();
    assert!(task.is_stopped());
}

#[test]
fn test_stopped_task_is_discarded_not_reused() {
    let service = service();
    let task = service.available_task().unwrap();

    task.stop();
    service.remove_task(&task);
    assert_eq!(service.available_tasks(), 0);
    assert_eq!(service.runnable_tasks(), 0);
    assert!(!service.contains(&task));

    let fresh = service.available_task().unwrap();
    assert_ne!(fresh.id(), task.id());
    assert!(!fresh.is_stopped());

    // Unknown tasks are ignored.
    service.remove_task(&task);
    service.stop();
}

#[test]
fn test_concurrent_task_checkout_never_shares_a_task() {
    let service = service();
    let holders = Arc::new(Mutex::new(HashSet::new()));
    let shared = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let holders = holders.clone();
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    let task = service.available_task().unwrap();
                    if !holders.lock().unwrap().insert(task.id()) {
                        shared.store(true, Ordering::SeqCst);
                    }
                    thread::yield_now();
                    holders.lock().unwrap().remove(&task.id());
                    service.remove_task(&task);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(!shared.load(Ordering::SeqCst));
    assert!(service.tasks_consistent());
    assert_eq!(service.runnable_tasks(), 0);
    assert!(service.available_tasks() <= 8);
    service.stop();
}

#[test]
fn test_available_task_after_stop_fails() {
    let service = service();
    service.stop();

    assert!(matches!(service.available_task(), Err(Error::Stopped)));
}

#[test]
fn test_stop_drains_task_pool() {
    let service = service();
    let lent = service.available_task().unwrap();
    let idle = service.available_task().unwrap();
    service.remove_task(&idle);

    service.stop();

    assert!(lent.is_stopped());
    assert!(idle.is_stopped());
    assert_eq!(service.available_tasks(), 0);
    assert_eq!(service.runnable_tasks(), 0);
}

#[test]
fn test_timer_fires_on_main_reactor() {
    let service = service();
    let (tx, rx) = mpsc::channel();

    let timer = Timer::after(&service, Duration::from_millis(20), move || {
        tx.send(()).unwrap();
    })
    .unwrap();
    assert!(service.contains(&timer));

    rx.recv_timeout(WAIT).unwrap();
    assert!(timer.has_fired());
    service.stop();
}

#[test]
fn test_stopped_timer_never_fires() {
    let service = service();
    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();

    let timer = Timer::after(&service, Duration::from_millis(50), move || {
        flag.store(true, Ordering::SeqCst);
    })
    .unwrap();
    timer.stop();
    assert!(!service.contains(&timer));

    thread::sleep(Duration::from_millis(150));
    assert!(!fired.load(Ordering::SeqCst));
    assert!(!timer.has_fired());
    service.stop();
}

#[test]
fn test_service_stop_cancels_pending_timer() {
    let service = service();
    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();

    let timer = Timer::after(&service, Duration::from_secs(60), move || {
        flag.store(true, Ordering::SeqCst);
    })
    .unwrap();

    service.stop();
    assert!(timer.is_stopped());
    assert!(!fired.load(Ordering::SeqCst));
}
