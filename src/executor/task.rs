//! Task representation and the cooperative-cancellation contract.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a submitted task.
///
/// Used as the registry key; has no meaning beyond identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// The capability a unit of work implements to participate in tracking
/// and bulk cancellation.
///
/// `cancel` must be safe to call at any point in the task's life,
/// including after completion, and must be monotonic: once cancelled, a
/// task never reports uncancelled again. Task bodies are expected to poll
/// `is_cancelled` at safe points and return early when it reads true; the
/// pool never preempts a running body.
///
/// Implementors typically embed a [`CancelFlag`]:
///
/// ```
/// use backplane::{CancellableTask, CancelFlag};
///
/// struct Render {
///     cancelled: CancelFlag,
/// }
///
/// impl CancellableTask for Render {
///     fn run(&self) {
///         for _tile in 0..1000 {
///             if self.cancelled.is_cancelled() {
///                 return;
///             }
///             // render one tile
///         }
///     }
///     fn cancel(&self) {
///         self.cancelled.cancel();
///     }
///     fn is_cancelled(&self) -> bool {
///         self.cancelled.is_cancelled()
///     }
/// }
/// ```
pub trait CancellableTask: Send + Sync + 'static {
    /// Execute the task body. Called at most once, on a worker thread.
    fn run(&self);

    /// Signal the task to stop at its next safe point.
    fn cancel(&self);

    /// Whether the task has been signalled.
    fn is_cancelled(&self) -> bool;
}

/// A monotonic cancellation flag.
///
/// The only transition is `false -> true`; there is no reset.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Lifecycle of a tracked task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum TaskState {
    Submitted = 0,
    Queued = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
    CancelledBeforeStart = 5,
    CancelledWhileRunning = 6,
}

impl TaskState {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed
                | TaskState::Failed
                | TaskState::CancelledBeforeStart
                | TaskState::CancelledWhileRunning
        )
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Submitted,
            1 => TaskState::Queued,
            2 => TaskState::Running,
            3 => TaskState::Completed,
            4 => TaskState::Failed,
            5 => TaskState::CancelledBeforeStart,
            _ => TaskState::CancelledWhileRunning,
        }
    }
}

/// Atomic holder for a [`TaskState`].
///
/// The contended transitions out of `Queued` are compare-and-swap so the
/// race between a worker starting a task and a cancellation sweep
/// discarding it resolves to exactly one winner.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        StateCell(AtomicU8::new(TaskState::Submitted as u8))
    }

    pub(crate) fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Submitted -> Queued. Called once by the pool before the task is
    /// published to the work queue.
    pub(crate) fn mark_queued(&self) {
        self.0.store(TaskState::Queued as u8, Ordering::Release);
    }

    /// Queued -> Running. Returns false if the task already left Queued.
    pub(crate) fn try_start(&self) -> bool {
        self.0
            .compare_exchange(
                TaskState::Queued as u8,
                TaskState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Queued -> CancelledBeforeStart. Returns false if a worker won the
    /// race and the task is (or was) running.
    pub(crate) fn try_cancel_before_start(&self) -> bool {
        self.0
            .compare_exchange(
                TaskState::Queued as u8,
                TaskState::CancelledBeforeStart as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Running -> terminal.
    pub(crate) fn finish(&self, terminal: TaskState) {
        debug_assert!(terminal.is_terminal());
        self.0.store(terminal as u8, Ordering::Release);
    }
}

/// A cancellable task plus the bookkeeping shared between the work queue
/// and the registry.
pub(crate) struct Tracked {
    pub(crate) id: TaskId,
    pub(crate) body: Arc<dyn CancellableTask>,
    pub(crate) state: StateCell,
}

impl Tracked {
    pub(crate) fn new(body: Arc<dyn CancellableTask>) -> Arc<Self> {
        Arc::new(Tracked {
            id: TaskId::next(),
            body,
            state: StateCell::new(),
        })
    }
}

/// Unit of work carried by the pool's queue.
pub(crate) enum Task {
    /// Plain fire-and-forget closure; never enters the registry.
    Untracked {
        id: TaskId,
        func: Box<dyn FnOnce() + Send + 'static>,
    },
    /// Registry-tracked cancellable task.
    Tracked(Arc<Tracked>),
}

impl Task {
    pub(crate) fn id(&self) -> TaskId {
        match self {
            Task::Untracked { id, .. } => *id,
            Task::Tracked(t) => t.id,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Untracked { id, .. } => f.debug_tuple("Untracked").field(id).finish(),
            Task::Tracked(t) => f
                .debug_struct("Tracked")
                .field("id", &t.id)
                .field("state", &t.state.get())
                .finish(),
        }
    }
}
