//! Per-session canonical desk/task state

use std::collections::HashMap;

use tracing::debug;

use crate::bounds::Bounds;
use crate::events::{DeskEvent, EventHub};
use crate::persistence::{PersistedDesk, Snapshot};
use crate::task::{TaskId, TaskMembership};
use super::{Desk, DeskId, DisplayId, OverlayRecord, UserId};

/// Canonical desk state for one user session
///
/// One instance exists per session and is owned exclusively by it; all
/// mutation happens on the session's sequencing context, so there is no
/// internal locking. Commits are pushed to subscribed listeners.
pub struct DeskRepository {
    /// Owning user session
    user: UserId,
    /// All desks, in creation order
    desks: Vec<Desk>,
    /// Active desk per display
    active: HashMap<DisplayId, DeskId>,
    /// Task membership, keyed by task
    tasks: HashMap<TaskId, TaskMembership>,
    /// Committed-state listeners
    events: EventHub,
}

impl DeskRepository {
    /// Create an empty repository for a user session
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            desks: Vec::new(),
            active: HashMap::new(),
            tasks: HashMap::new(),
            events: EventHub::default(),
        }
    }

    /// The owning user session
    #[inline]
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Register a committed-state listener
    pub fn subscribe(&mut self, listener: Box<dyn FnMut(&DeskEvent)>) {
        self.events.subscribe(listener);
    }

    // =========================================================================
    // Desks
    // =========================================================================

    /// Record a desk created by the backend
    ///
    /// Desk ids are backend-assigned and never reused; registering a
    /// duplicate id is an invariant violation.
    pub fn add_desk(&mut self, desk: DeskId, display: DisplayId) {
        assert!(
            self.desk(desk).is_none(),
            "inconsistent state: desk {desk} registered twice"
        );
        self.desks.push(Desk::new(desk, display, self.user));
        self.events.emit(DeskEvent::DeskAdded { desk, display });
    }

    /// Remove a desk and every membership it owns
    pub fn remove_desk(&mut self, desk: DeskId) {
        let Some(index) = self.desks.iter().position(|d| d.id == desk) else {
            debug!(desk, user = self.user, "remove_desk: desk not found");
            return;
        };
        let display = self.desks[index].display;

        self.tasks.retain(|_, m| m.desk != desk);
        self.desks.remove(index);

        if self.active.get(&display) == Some(&desk) {
            self.active.remove(&display);
            self.events.emit(DeskEvent::ActiveDeskChanged {
                display,
                old: Some(desk),
                new: None,
            });
        }
        self.events.emit(DeskEvent::DeskRemoved { desk, display });
        self.emit_visible_count(display);
    }

    /// Get a desk by id
    pub fn desk(&self, desk: DeskId) -> Option<&Desk> {
        self.desks.iter().find(|d| d.id == desk)
    }

    /// Get a desk by id mutably
    pub(crate) fn desk_mut(&mut self, desk: DeskId) -> Option<&mut Desk> {
        self.desks.iter_mut().find(|d| d.id == desk)
    }

    /// Ids of every desk in the session
    pub fn all_desk_ids(&self) -> Vec<DeskId> {
        self.desks.iter().map(|d| d.id).collect()
    }

    /// Desks homed on a display
    pub fn desks_on_display(&self, display: DisplayId) -> impl Iterator<Item = &Desk> {
        self.desks.iter().filter(move |d| d.display == display)
    }

    /// The default desk for a display (oldest desk homed there)
    pub fn default_desk_id(&self, display: DisplayId) -> Option<DeskId> {
        self.desks_on_display(display).next().map(|d| d.id)
    }

    /// Re-home a desk onto a different display
    pub fn set_desk_display(&mut self, desk: DeskId, display: DisplayId) {
        let Some(d) = self.desk_mut(desk) else {
            debug!(desk, "set_desk_display: desk not found");
            return;
        };
        let old_display = d.display;
        d.display = display;
        if self.active.get(&old_display) == Some(&desk) {
            self.active.remove(&old_display);
            self.events.emit(DeskEvent::ActiveDeskChanged {
                display: old_display,
                old: Some(desk),
                new: None,
            });
        }
    }

    // =========================================================================
    // Active desk per display
    // =========================================================================

    /// Whether the desk is the active desk of its display
    pub fn is_desk_active(&self, desk: DeskId) -> bool {
        self.active.values().any(|d| *d == desk)
    }

    /// The active desk for a display
    pub fn active_desk_id(&self, display: DisplayId) -> Option<DeskId> {
        self.active.get(&display).copied()
    }

    /// Point the display's active desk at `desk`
    pub fn set_active_desk(&mut self, display: DisplayId, desk: DeskId) {
        let old = self.active.insert(display, desk);
        if old != Some(desk) {
            self.events.emit(DeskEvent::ActiveDeskChanged {
                display,
                old,
                new: Some(desk),
            });
        }
    }

    /// Clear the display's active desk, but only if it still points at
    /// `desk` (a later activation may already have replaced it)
    pub fn clear_active_desk(&mut self, display: DisplayId, desk: DeskId) {
        if self.active.get(&display) == Some(&desk) {
            self.active.remove(&display);
            self.events.emit(DeskEvent::ActiveDeskChanged {
                display,
                old: Some(desk),
                new: None,
            });
        }
    }

    // =========================================================================
    // Task membership
    // =========================================================================

    /// The desk a task belongs to
    pub fn desk_id_for_task(&self, task: TaskId) -> Option<DeskId> {
        let desk = self.tasks.get(&task)?.desk;
        // A membership pointing at a missing desk is corruption, not a
        // recoverable condition.
        assert!(
            self.desk(desk).is_some(),
            "inconsistent state: task {task} mapped to missing desk {desk}"
        );
        Some(desk)
    }

    /// A task's membership record
    pub fn membership(&self, task: TaskId) -> Option<&TaskMembership> {
        self.tasks.get(&task)
    }

    /// A task's membership record, mutably
    pub(crate) fn membership_mut(&mut self, task: TaskId) -> Option<&mut TaskMembership> {
        self.tasks.get_mut(&task)
    }

    /// Record a task entering a desk at the front of the expanded order
    ///
    /// Moves the membership if the task already belonged to another desk;
    /// a task belongs to at most one desk.
    pub fn add_task_to_desk(
        &mut self,
        task: TaskId,
        desk: DeskId,
        app_id: &str,
        bounds: Bounds,
    ) {
        if self.desk(desk).is_none() {
            debug!(task, desk, "add_task_to_desk: desk not found");
            return;
        }
        let old_display = self.detach_task(task);

        if let Some(m) = self.tasks.get_mut(&task) {
            m.desk = desk;
            m.visible = true;
            m.minimized = false;
            m.bounds = bounds;
        } else {
            self.tasks
                .insert(task, TaskMembership::new(task, desk, app_id, bounds));
        }
        let display = {
            let d = self.desk_mut(desk).expect("desk checked above");
            d.move_to_front(task);
            d.display
        };

        if let Some(old_display) = old_display.filter(|od| *od != display) {
            self.emit_visible_count(old_display);
        }
        self.emit_visible_count(display);
    }

    /// Bring an expanded task to the front of its desk's order
    pub fn move_task_to_front(&mut self, task: TaskId) {
        let Some(desk) = self.desk_id_for_task(task) else {
            debug!(task, "move_task_to_front: no membership");
            return;
        };
        if let Some(m) = self.tasks.get_mut(&task) {
            m.minimized = false;
            m.visible = true;
        }
        if let Some(d) = self.desk_mut(desk) {
            d.move_to_front(task);
        }
    }

    /// Remove a task's membership entirely
    pub fn remove_task(&mut self, task: TaskId) {
        if let Some(display) = self.detach_task(task) {
            self.tasks.remove(&task);
            self.emit_visible_count(display);
        }
    }

    /// Detach a task from whichever desk holds it, returning that desk's
    /// display; leaves the membership map untouched
    fn detach_task(&mut self, task: TaskId) -> Option<DisplayId> {
        let desk = self.tasks.get(&task)?.desk;
        let d = self
            .desk_mut(desk)
            .unwrap_or_else(|| panic!("inconsistent state: task {task} mapped to missing desk {desk}"));
        d.remove_task(task);
        Some(d.display)
    }

    /// Commit a minimize or unminimize for a task
    pub fn set_task_minimized(&mut self, task: TaskId, minimized: bool) {
        let Some(desk) = self.desk_id_for_task(task) else {
            debug!(task, minimized, "set_task_minimized: no membership");
            return;
        };
        let display = {
            let d = self.desk_mut(desk).expect("membership checked");
            d.set_minimized(task, minimized);
            d.display
        };
        if let Some(m) = self.tasks.get_mut(&task) {
            m.minimized = minimized;
            m.visible = !minimized;
        }
        self.events.emit(if minimized {
            DeskEvent::TaskMinimized { desk, task }
        } else {
            DeskEvent::TaskUnminimized { desk, task }
        });
        self.emit_visible_count(display);
    }

    /// Whether a task is minimized
    pub fn is_minimized_task(&self, task: TaskId) -> bool {
        self.tasks.get(&task).is_some_and(|m| m.minimized)
    }

    /// Mark a task as closing
    pub fn set_task_closing(&mut self, task: TaskId, closing: bool) {
        if let Some(m) = self.tasks.get_mut(&task) {
            m.closing = closing;
        }
    }

    /// Save a task's current bounds on its desk before it maximizes
    pub fn save_pre_maximize_bounds(&mut self, task: TaskId) {
        let Some(m) = self.tasks.get(&task) else {
            debug!(task, "save_pre_maximize_bounds: no membership");
            return;
        };
        let (desk, bounds) = (m.desk, m.bounds);
        if let Some(d) = self.desk_mut(desk) {
            d.save_pre_maximize_bounds(task, bounds);
        }
    }

    /// A task's saved pre-maximize bounds, if any
    pub fn pre_maximize_bounds(&self, task: TaskId) -> Option<Bounds> {
        let desk = self.tasks.get(&task)?.desk;
        self.desk(desk)?.pre_maximize_bounds(task)
    }

    /// Take a task's saved pre-maximize bounds
    pub fn take_pre_maximize_bounds(&mut self, task: TaskId) -> Option<Bounds> {
        let desk = self.tasks.get(&task)?.desk;
        self.desk_mut(desk)?.take_pre_maximize_bounds(task)
    }

    /// Record or clear the desk's transparent top overlay task
    pub fn set_top_overlay(&mut self, desk: DeskId, task: Option<TaskId>) {
        let Some(d) = self.desk_mut(desk) else {
            debug!(desk, "set_top_overlay: desk not found");
            return;
        };
        d.top_overlay = task.map(|task| OverlayRecord { task });
    }

    /// The desk's transparent top overlay task, if any
    pub fn top_overlay(&self, desk: DeskId) -> Option<TaskId> {
        self.desk(desk)?.top_overlay.map(|o| o.task)
    }

    /// A desk's expanded tasks, front-to-back
    pub fn expanded_tasks_ordered(&self, desk: DeskId) -> Vec<TaskId> {
        self.desk(desk)
            .map(|d| d.expanded_tasks().to_vec())
            .unwrap_or_default()
    }

    /// Count of visible (expanded, non-closing) tasks across a display
    pub fn visible_task_count(&self, display: DisplayId) -> usize {
        self.desks_on_display(display)
            .flat_map(|d| d.expanded_tasks())
            .filter(|t| {
                self.tasks
                    .get(t)
                    .is_some_and(|m| m.visible && !m.closing)
            })
            .count()
    }

    fn emit_visible_count(&mut self, display: DisplayId) {
        let count = self.visible_task_count(display);
        self.events
            .emit(DeskEvent::VisibleTaskCountChanged { display, count });
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Export the desk layout for best-effort persistence
    pub fn export_for_persistence(&self) -> Snapshot {
        let desks = self
            .desks
            .iter()
            .map(|d| PersistedDesk {
                id: d.id,
                display: d.display,
                expanded: d.expanded_tasks().to_vec(),
                minimized: d.minimized_tasks().iter().copied().collect(),
            })
            .collect();
        let active = self.active.iter().map(|(d, k)| (*d, *k)).collect();
        Snapshot::new(self.user, desks, active)
    }

    /// Restore desk layout from a snapshot
    ///
    /// Best effort: memberships are recreated with default bounds and an
    /// empty app id; the platform refreshes both as tasks reappear.
    pub fn import_from_persistence(&mut self, snapshot: &Snapshot) {
        for p in &snapshot.desks {
            if self.desk(p.id).is_none() {
                self.add_desk(p.id, p.display);
            }
            for task in p.expanded.iter().rev() {
                self.add_task_to_desk(*task, p.id, "", Bounds::ZERO);
            }
            for task in &p.minimized {
                self.add_task_to_desk(*task, p.id, "", Bounds::ZERO);
                self.set_task_minimized(*task, true);
            }
        }
        for (display, desk) in &snapshot.active {
            if self.desk(*desk).is_some() {
                self.set_active_desk(*display, *desk);
            }
        }
    }
}

impl std::fmt::Debug for DeskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeskRepository")
            .field("user", &self.user)
            .field("desks", &self.desks)
            .field("active", &self.active)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn repo_with_desk() -> DeskRepository {
        let mut repo = DeskRepository::new(0);
        repo.add_desk(1, 0);
        repo
    }

    #[test]
    fn test_task_belongs_to_one_desk() {
        let mut repo = repo_with_desk();
        repo.add_desk(2, 0);

        repo.add_task_to_desk(10, 1, "app", Bounds::ZERO);
        assert_eq!(repo.desk_id_for_task(10), Some(1));

        repo.add_task_to_desk(10, 2, "app", Bounds::ZERO);
        assert_eq!(repo.desk_id_for_task(10), Some(2));
        assert!(repo.expanded_tasks_ordered(1).is_empty());
        assert_eq!(repo.expanded_tasks_ordered(2), vec![10]);
    }

    #[test]
    fn test_active_desk_per_display() {
        let mut repo = repo_with_desk();
        repo.add_desk(2, 0);

        repo.set_active_desk(0, 1);
        assert!(repo.is_desk_active(1));
        repo.set_active_desk(0, 2);
        assert_eq!(repo.active_desk_id(0), Some(2));
        assert!(!repo.is_desk_active(1));

        // Clearing only succeeds against the current pointer.
        repo.clear_active_desk(0, 1);
        assert_eq!(repo.active_desk_id(0), Some(2));
        repo.clear_active_desk(0, 2);
        assert_eq!(repo.active_desk_id(0), None);
    }

    #[test]
    fn test_remove_desk_drops_memberships() {
        let mut repo = repo_with_desk();
        repo.add_task_to_desk(10, 1, "app", Bounds::ZERO);
        repo.add_task_to_desk(11, 1, "app", Bounds::ZERO);
        repo.set_active_desk(0, 1);

        repo.remove_desk(1);
        assert!(repo.desk(1).is_none());
        assert_eq!(repo.desk_id_for_task(10), None);
        assert_eq!(repo.desk_id_for_task(11), None);
        assert_eq!(repo.active_desk_id(0), None);
    }

    #[test]
    fn test_minimize_commits_update_visibility() {
        let mut repo = repo_with_desk();
        repo.add_task_to_desk(10, 1, "app", Bounds::ZERO);
        repo.add_task_to_desk(11, 1, "app", Bounds::ZERO);
        assert_eq!(repo.visible_task_count(0), 2);

        repo.set_task_minimized(10, true);
        assert!(repo.is_minimized_task(10));
        assert_eq!(repo.visible_task_count(0), 1);
        assert_eq!(repo.expanded_tasks_ordered(1), vec![11]);

        repo.set_task_minimized(10, false);
        assert_eq!(repo.expanded_tasks_ordered(1), vec![10, 11]);
    }

    #[test]
    fn test_events_are_pushed_to_listeners() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut repo = DeskRepository::new(0);
        let sink = seen.clone();
        repo.subscribe(Box::new(move |e| sink.borrow_mut().push(*e)));

        repo.add_desk(1, 0);
        repo.set_active_desk(0, 1);
        repo.add_task_to_desk(10, 1, "app", Bounds::ZERO);
        repo.set_task_minimized(10, true);

        let events = seen.borrow();
        assert!(events.contains(&DeskEvent::DeskAdded { desk: 1, display: 0 }));
        assert!(events.contains(&DeskEvent::ActiveDeskChanged {
            display: 0,
            old: None,
            new: Some(1)
        }));
        assert!(events.contains(&DeskEvent::TaskMinimized { desk: 1, task: 10 }));
        assert!(events.contains(&DeskEvent::VisibleTaskCountChanged { display: 0, count: 0 }));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_desk_id_is_an_invariant_violation() {
        let mut repo = repo_with_desk();
        repo.add_desk(1, 0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut repo = repo_with_desk();
        repo.add_task_to_desk(10, 1, "app", Bounds::ZERO);
        repo.add_task_to_desk(11, 1, "app", Bounds::ZERO);
        repo.set_task_minimized(11, true);
        repo.set_active_desk(0, 1);

        let snapshot = repo.export_for_persistence();
        let mut restored = DeskRepository::new(0);
        restored.import_from_persistence(&snapshot);

        assert_eq!(restored.expanded_tasks_ordered(1), vec![10]);
        assert!(restored.is_minimized_task(11));
        assert_eq!(restored.active_desk_id(0), Some(1));
    }
}
