//! Desk struct and per-desk task bookkeeping

use std::collections::{HashMap, HashSet};

use crate::bounds::Bounds;
use crate::task::TaskId;
use super::{DeskId, DisplayId, UserId};

/// Record of a transparent overlay task sitting above the desk's tasks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayRecord {
    /// The overlay task
    pub task: TaskId,
}

/// A desk: one virtual workspace grouping tasks on a display
#[derive(Clone, Debug)]
pub struct Desk {
    /// Unique identifier
    pub id: DeskId,
    /// Owning display
    pub display: DisplayId,
    /// Owning user session
    pub user: UserId,
    /// Expanded tasks, front-to-back (index 0 = most recent)
    expanded: Vec<TaskId>,
    /// Minimized tasks
    minimized: HashSet<TaskId>,
    /// Top transparent overlay, if any
    pub top_overlay: Option<OverlayRecord>,
    /// Saved pre-maximize bounds per task
    saved_bounds: HashMap<TaskId, Bounds>,
}

impl Desk {
    /// Create a new empty desk
    pub fn new(id: DeskId, display: DisplayId, user: UserId) -> Self {
        Self {
            id,
            display,
            user,
            expanded: Vec::new(),
            minimized: HashSet::new(),
            top_overlay: None,
            saved_bounds: HashMap::new(),
        }
    }

    /// Expanded tasks in front-to-back order
    #[inline]
    pub fn expanded_tasks(&self) -> &[TaskId] {
        &self.expanded
    }

    /// Minimized task set
    #[inline]
    pub fn minimized_tasks(&self) -> &HashSet<TaskId> {
        &self.minimized
    }

    /// Check whether a task belongs to this desk (expanded or minimized)
    pub fn contains_task(&self, task: TaskId) -> bool {
        self.expanded.contains(&task) || self.minimized.contains(&task)
    }

    /// Check whether a task is minimized on this desk
    #[inline]
    pub fn is_minimized(&self, task: TaskId) -> bool {
        self.minimized.contains(&task)
    }

    /// Total number of tasks on this desk
    pub fn task_count(&self) -> usize {
        self.expanded.len() + self.minimized.len()
    }

    /// Add or reorder a task to the front of the expanded order
    ///
    /// Removes a duplicate entry if the task was already expanded, and
    /// clears it from the minimized set.
    pub fn move_to_front(&mut self, task: TaskId) {
        self.expanded.retain(|t| *t != task);
        self.minimized.remove(&task);
        self.expanded.insert(0, task);
    }

    /// Remove a task from the desk entirely
    pub fn remove_task(&mut self, task: TaskId) {
        self.expanded.retain(|t| *t != task);
        self.minimized.remove(&task);
        self.saved_bounds.remove(&task);
        if self.top_overlay.map(|o| o.task) == Some(task) {
            self.top_overlay = None;
        }
    }

    /// Move a task between the expanded order and the minimized set
    pub fn set_minimized(&mut self, task: TaskId, minimized: bool) {
        if minimized {
            self.expanded.retain(|t| *t != task);
            self.minimized.insert(task);
        } else if self.minimized.remove(&task) {
            self.expanded.insert(0, task);
        }
    }

    /// Save a task's bounds before it maximizes
    pub fn save_pre_maximize_bounds(&mut self, task: TaskId, bounds: Bounds) {
        self.saved_bounds.insert(task, bounds);
    }

    /// A task's saved pre-maximize bounds, if any
    pub fn pre_maximize_bounds(&self, task: TaskId) -> Option<Bounds> {
        self.saved_bounds.get(&task).copied()
    }

    /// Take a task's saved pre-maximize bounds
    pub fn take_pre_maximize_bounds(&mut self, task: TaskId) -> Option<Bounds> {
        self.saved_bounds.remove(&task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_to_front_order() {
        let mut desk = Desk::new(1, 0, 0);
        desk.move_to_front(10);
        desk.move_to_front(11);
        desk.move_to_front(12);
        assert_eq!(desk.expanded_tasks(), &[12, 11, 10]);

        // Re-fronting an existing task removes the duplicate
        desk.move_to_front(10);
        assert_eq!(desk.expanded_tasks(), &[10, 12, 11]);
    }

    #[test]
    fn test_minimize_bookkeeping() {
        let mut desk = Desk::new(1, 0, 0);
        desk.move_to_front(10);
        desk.move_to_front(11);

        desk.set_minimized(10, true);
        assert_eq!(desk.expanded_tasks(), &[11]);
        assert!(desk.is_minimized(10));
        assert_eq!(desk.task_count(), 2);

        desk.set_minimized(10, false);
        assert_eq!(desk.expanded_tasks(), &[10, 11]);
        assert!(!desk.is_minimized(10));
    }

    #[test]
    fn test_unminimize_unknown_task_is_noop() {
        let mut desk = Desk::new(1, 0, 0);
        desk.move_to_front(10);
        desk.set_minimized(99, false);
        assert_eq!(desk.expanded_tasks(), &[10]);
    }

    #[test]
    fn test_remove_task_clears_overlay_and_bounds() {
        let mut desk = Desk::new(1, 0, 0);
        desk.move_to_front(10);
        desk.top_overlay = Some(OverlayRecord { task: 10 });
        desk.save_pre_maximize_bounds(10, Bounds::new(0, 0, 100, 100));

        desk.remove_task(10);
        assert!(!desk.contains_task(10));
        assert!(desk.top_overlay.is_none());
        assert!(desk.take_pre_maximize_bounds(10).is_none());
    }
}
