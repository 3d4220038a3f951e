//! Pending bookkeeping intents bound to a transition token

use crate::bounds::Bounds;
use crate::desk::{DeskId, DisplayId};
use crate::task::TaskId;

/// A recorded mutation plan, applied to the repository only once its
/// transition validates as ready
///
/// All intents for a token live in one ordered list in the coordinator;
/// within a change-set they commit independently, in registration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingIntent {
    /// Make a desk the active desk of its display, optionally bringing a
    /// (possibly reparented) task to the front
    Activate {
        desk: DeskId,
        display: DisplayId,
        foreground: Option<TaskId>,
        /// Bounds for the foreground task when it was reparented in
        foreground_bounds: Option<Bounds>,
        /// App id for a foreground task whose membership may not exist yet
        foreground_app: Option<String>,
    },
    /// Clear the display's active-desk pointer if it still points here
    Deactivate { desk: DeskId, display: DisplayId },
    /// Commit a minimize, subject to ready-time validation
    Minimize { desk: DeskId, task: TaskId },
    /// Commit an unminimize, unconditional at ready
    Unminimize { desk: DeskId, task: TaskId },
    /// Save the task's placement and commit its maximized bounds
    Maximize {
        desk: DeskId,
        task: TaskId,
        bounds: Bounds,
    },
    /// Restore the task's saved pre-maximize placement
    Unmaximize { desk: DeskId, task: TaskId },
    /// Remove a desk and the carried task set in one commit
    RemoveDesk {
        desk: DeskId,
        display: DisplayId,
        tasks: Vec<TaskId>,
    },
    /// Re-home a desk onto another display
    ChangeDeskDisplay { desk: DeskId, to_display: DisplayId },
    /// Tear down every desk that was homed on a disconnected display
    RemoveDisplay {
        display: DisplayId,
        desks: Vec<DeskId>,
    },
}
