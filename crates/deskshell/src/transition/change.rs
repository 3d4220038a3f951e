//! Change-set primitives and ready-change descriptions

use std::collections::HashMap;

use crate::bounds::Bounds;
use crate::desk::DeskId;
use crate::task::TaskId;

/// One primitive operation inside a change-set handed to the pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeskChangeOp {
    /// Bring a desk's root to the foreground
    ActivateDesk { desk: DeskId },
    /// Send a desk's root behind everything else
    DeactivateDesk { desk: DeskId },
    /// Reorder a task to the front of its desk
    ReorderToFront { task: TaskId },
    /// Relaunch a backgrounded task into its desk
    LaunchTask { task: TaskId },
    /// Reparent a task into a desk at the given bounds
    ReparentTask {
        task: TaskId,
        desk: DeskId,
        bounds: Bounds,
    },
    /// Override a task's display density
    SetTaskDensity { task: TaskId, dpi: u32 },
    /// Send a task to the minimized (hidden) state
    MinimizeTask { task: TaskId },
    /// Bring a minimized task back to the expanded state
    UnminimizeTask { task: TaskId },
    /// Remove a task's surface entirely
    RemoveTask { task: TaskId },
    /// Remove a desk's root
    RemoveDesk { desk: DeskId },
}

/// Where a transition left a task, as reported at ready time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskReadyMode {
    /// The task moved to the front
    ToFront,
    /// The task moved to the back (hidden)
    ToBack,
    /// The task's surface closed
    Close,
    /// The task changed without reordering
    Change,
}

/// Per-task outcome of a transition, delivered with the ready callback
#[derive(Clone, Debug, Default)]
pub struct ReadyChange {
    changes: HashMap<TaskId, TaskReadyMode>,
}

impl ReadyChange {
    /// An empty ready-change (no per-task outcomes reported)
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task's outcome
    pub fn with_task(mut self, task: TaskId, mode: TaskReadyMode) -> Self {
        self.changes.insert(task, mode);
        self
    }

    /// The reported outcome for a task
    pub fn mode_for(&self, task: TaskId) -> Option<TaskReadyMode> {
        self.changes.get(&task).copied()
    }

    /// Whether the change shows the task ending hidden
    pub fn task_goes_hidden(&self, task: TaskId) -> bool {
        matches!(
            self.mode_for(task),
            Some(TaskReadyMode::ToBack) | Some(TaskReadyMode::Close)
        )
    }
}
