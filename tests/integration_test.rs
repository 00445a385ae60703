use backplane::{CancelFlag, CancellableTask, Config, TaskPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

fn pool_with(n: usize) -> TaskPool {
    let config = Config::builder().num_threads(n).build().unwrap();
    TaskPool::new(&config).unwrap()
}

fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    done()
}

/// A task that holds its worker until it observes its cancellation flag,
/// while keeping a shared gauge of how many copies are physically running.
struct LoopTask {
    flag: CancelFlag,
    started: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl LoopTask {
    fn batch(count: usize) -> (Vec<Arc<LoopTask>>, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let started = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks = (0..count)
            .map(|_| {
                Arc::new(LoopTask {
                    flag: CancelFlag::new(),
                    started: started.clone(),
                    running: running.clone(),
                    peak: peak.clone(),
                })
            })
            .collect();
        (tasks, started, running, peak)
    }
}

impl CancellableTask for LoopTask {
    fn run(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        while !self.flag.is_cancelled() {
            thread::sleep(Duration::from_millis(1));
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.flag.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }
}

#[test]
fn test_bounded_concurrency_and_bulk_cancel() {
    let pool = pool_with(2);
    let (tasks, started, running, peak) = LoopTask::batch(5);

    for task in &tasks {
        pool.submit_cancellable(task.clone()).unwrap();
    }

    // Both workers pick up a looper; the other three stay queued.
    assert!(wait_for(Duration::from_secs(5), || {
        started.load(Ordering::SeqCst) == 2
    }));
    assert_eq!(pool.tracked_tasks(), 5);

    pool.cancel_all();

    // The registry empties synchronously and every task is signalled,
    // started or not.
    assert_eq!(pool.tracked_tasks(), 0);
    assert!(tasks.iter().all(|t| t.is_cancelled()));

    assert!(wait_for(Duration::from_secs(5), || {
        running.load(Ordering::SeqCst) == 0
    }));

    // No more than two loopers ever ran at once, and the three that were
    // still queued at cancellation time never started.
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(started.load(Ordering::SeqCst), 2);
}

#[test]
fn test_queued_tasks_discarded_before_start() {
    let pool = pool_with(1);
    let (tasks, started, running, _peak) = LoopTask::batch(4);

    // The first looper occupies the only worker.
    pool.submit_cancellable(tasks[0].clone()).unwrap();
    assert!(wait_for(Duration::from_secs(5), || {
        started.load(Ordering::SeqCst) == 1
    }));

    for task in &tasks[1..] {
        pool.submit_cancellable(task.clone()).unwrap();
    }
    assert_eq!(pool.tracked_tasks(), 4);

    pool.cancel_all();

    assert_eq!(pool.tracked_tasks(), 0);
    assert!(tasks.iter().all(|t| t.is_cancelled()));

    assert!(wait_for(Duration::from_secs(5), || {
        running.load(Ordering::SeqCst) == 0
    }));
    assert_eq!(started.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_all_is_idempotent() {
    let pool = pool_with(2);
    let (tasks, _started, running, _peak) = LoopTask::batch(2);

    for task in &tasks {
        pool.submit_cancellable(task.clone()).unwrap();
    }

    pool.cancel_all();
    pool.cancel_all();
    pool.cancel_all();

    assert_eq!(pool.tracked_tasks(), 0);
    assert!(wait_for(Duration::from_secs(5), || {
        running.load(Ordering::SeqCst) == 0
    }));
}

struct PanicTask {
    flag: CancelFlag,
}

impl CancellableTask for PanicTask {
    fn run(&self) {
        panic!("synthetic task failure");
    }
    fn cancel(&self) {
        self.flag.cancel();
    }
    fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }
}

#[test]
fn test_task_panic_is_isolated() {
    let pool = pool_with(1);

    pool.submit_cancellable(Arc::new(PanicTask {
        flag: CancelFlag::new(),
    }))
    .unwrap();

    // The failing task leaves the registry like any other completion.
    assert!(wait_for(Duration::from_secs(5), || pool.tracked_tasks() == 0));

    // The pool stays serviceable on the same worker thread.
    let (tx, rx) = mpsc::channel();
    pool.submit(move || {
        tx.send("still alive").unwrap();
    })
    .unwrap();
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "still alive"
    );
}

#[test]
fn test_registry_tracks_only_cancellable_work() {
    let pool = pool_with(2);
    let (started_tx, started_rx) = mpsc::channel();
    let release = Arc::new(AtomicUsize::new(0));

    // Plain closures never enter the registry, even while running.
    for _ in 0..2 {
        let tx = started_tx.clone();
        let release = release.clone();
        pool.submit(move || {
            tx.send(()).unwrap();
            while release.load(Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();
    }

    for _ in 0..2 {
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    assert_eq!(pool.tracked_tasks(), 0);

    release.store(1, Ordering::SeqCst);
}

#[test]
fn test_completion_order_independent_of_submission() {
    let pool = pool_with(2);
    let (tx, rx) = mpsc::channel();

    for i in 0..8u32 {
        let tx = tx.clone();
        pool.submit(move || {
            if i % 2 == 0 {
                thread::sleep(Duration::from_millis(5));
            }
            tx.send(i).unwrap();
        })
        .unwrap();
    }
    drop(tx);

    let mut seen: Vec<u32> = rx.iter().take(8).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_flag_monotonic_across_sweep() {
    let pool = pool_with(1);
    let (tasks, _started, running, _peak) = LoopTask::batch(1);

    pool.submit_cancellable(tasks[0].clone()).unwrap();
    pool.cancel_all();

    assert!(tasks[0].is_cancelled());
    assert!(wait_for(Duration::from_secs(5), || {
        running.load(Ordering::SeqCst) == 0
    }));

    // A later sweep never clears an already-set flag.
    pool.cancel_all();
    assert!(tasks[0].is_cancelled());
}
