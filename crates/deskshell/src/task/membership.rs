//! Task membership record

use crate::bounds::Bounds;
use crate::desk::DeskId;
use super::TaskId;

/// Why a task is being minimized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinimizeReason {
    /// The user asked for it (button, gesture, shortcut)
    UserInitiated,
    /// The desk exceeded its expanded-task limit
    TaskLimit,
}

/// A task's membership in a desk
///
/// A task belongs to at most one desk at a time; the repository enforces
/// this by moving the record on reparent rather than duplicating it.
#[derive(Clone, Debug)]
pub struct TaskMembership {
    /// The task
    pub task: TaskId,
    /// Owning desk
    pub desk: DeskId,
    /// Whether the task is currently visible
    pub visible: bool,
    /// Whether the task is minimized
    pub minimized: bool,
    /// Whether the task is closing (its surface is on the way out)
    pub closing: bool,
    /// Last known bounds
    pub bounds: Bounds,
    /// Application identifier, used for same-app bounds inheritance
    pub app_id: String,
}

impl TaskMembership {
    /// Create a fresh visible membership for a task entering a desk
    pub fn new(task: TaskId, desk: DeskId, app_id: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            task,
            desk,
            visible: true,
            minimized: false,
            closing: false,
            bounds,
            app_id: app_id.into(),
        }
    }
}
