//! Desk lifecycle orchestrator
//!
//! Sequences multi-step desk operations into one change-set plus the
//! bookkeeping intents that commit when the transition reports ready.
//! Nothing is registered until the caller binds the prepared transition
//! to a concrete token, so a change-set the pipeline never accepts has
//! no side effects.

use tracing::{debug, warn};

use crate::bounds::Bounds;
use crate::config::{DeskConfig, DeskModePolicy};
use crate::desk::{DeskId, DeskRepository, DisplayId, UserId};
use crate::error::DeskResult;
use crate::events::DeskEvent;
use crate::reconcile;
use crate::task::{FrontCandidate, MinimizeReason, TaskDirectory, TaskId, TaskLimiter};
use crate::transition::{
    DeskChangeOp, PendingIntent, ReadyChange, TransitionCoordinator, TransitionPipeline,
    TransitionToken,
};

/// Default bounds for a task placed with no instance to inherit from
pub const DEFAULT_TASK_BOUNDS: Bounds = Bounds::new(120, 80, 960, 640);

/// Diagonal step between cascaded task placements
pub const CASCADE_STEP: i32 = 50;

/// Number of cascade slots before placement wraps to the start
const CASCADE_SLOTS: i32 = 5;

/// A change-set plus the intents that commit it
///
/// Returned by every orchestrator operation. The caller submits the ops
/// to the transition pipeline, then binds the resulting token; dropping
/// the value instead discards the proposal with no side effects.
#[derive(Debug, Default)]
pub struct PreparedTransition {
    ops: Vec<DeskChangeOp>,
    intents: Vec<PendingIntent>,
}

impl PreparedTransition {
    /// Whether the operation produced no work
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.intents.is_empty()
    }

    /// The change-set, in commit order
    pub fn ops(&self) -> &[DeskChangeOp] {
        &self.ops
    }

    /// Number of bookkeeping intents awaiting a token
    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    /// Bind the recorded intents to a concrete transition token
    pub fn bind(self, token: TransitionToken, coordinator: &mut TransitionCoordinator) {
        coordinator.register(token, self.intents);
    }

    fn extend(&mut self, other: PreparedTransition) {
        self.ops.extend(other.ops);
        self.intents.extend(other.intents);
    }

    pub(crate) fn push(&mut self, op: DeskChangeOp, intent: Option<PendingIntent>) {
        self.ops.push(op);
        if let Some(intent) = intent {
            self.intents.push(intent);
        }
    }
}

/// Orchestrates desk/task lifecycle for one user session
///
/// Owns the session's repository, coordinator, limiter, and desk-mode
/// strategy. All methods run on the session's sequencing context.
#[derive(Debug)]
pub struct DeskOrganizer {
    repo: DeskRepository,
    coordinator: TransitionCoordinator,
    limiter: TaskLimiter,
    policy: Box<dyn DeskModePolicy>,
    density_override: Option<u32>,
}

impl DeskOrganizer {
    /// Create an organizer for a user session
    ///
    /// Fails only on invalid configuration (task limit of zero).
    pub fn new(user: UserId, config: &DeskConfig) -> DeskResult<Self> {
        Ok(Self {
            repo: DeskRepository::new(user),
            coordinator: TransitionCoordinator::new(),
            limiter: TaskLimiter::new(config.task_limit)?,
            policy: config.mode_policy(),
            density_override: config.density_override,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether the desk is its display's active desk
    pub fn is_desk_active(&self, desk: DeskId) -> bool {
        self.repo.is_desk_active(desk)
    }

    /// The active desk for a display
    pub fn active_desk_id(&self, display: DisplayId) -> Option<DeskId> {
        self.repo.active_desk_id(display)
    }

    /// A desk's expanded tasks, front-to-back
    pub fn expanded_tasks_ordered(&self, desk: DeskId) -> Vec<TaskId> {
        self.repo.expanded_tasks_ordered(desk)
    }

    /// Whether a task is minimized
    pub fn is_minimized_task(&self, task: TaskId) -> bool {
        self.repo.is_minimized_task(task)
    }

    /// The desk a task belongs to
    pub fn desk_id_for_task(&self, task: TaskId) -> Option<DeskId> {
        self.repo.desk_id_for_task(task)
    }

    /// Ids of every desk in the session
    pub fn all_desk_ids(&self) -> Vec<DeskId> {
        self.repo.all_desk_ids()
    }

    /// Whether another desk may be created on the display
    pub fn can_create_desks(&self, display: DisplayId) -> bool {
        let existing = self.repo.desks_on_display(display).count();
        self.policy.can_create_desk(display, existing)
    }

    /// The session's repository
    pub fn repository(&self) -> &DeskRepository {
        &self.repo
    }

    /// Register a committed-state listener
    pub fn subscribe(&mut self, listener: Box<dyn FnMut(&DeskEvent)>) {
        self.repo.subscribe(listener);
    }

    /// Record a desk the backend created for this session
    pub fn register_desk(&mut self, desk: DeskId, display: DisplayId) {
        self.repo.add_desk(desk, display);
    }

    /// Snapshot the session's committed state
    pub fn export_for_persistence(&self) -> crate::persistence::Snapshot {
        self.repo.export_for_persistence()
    }

    /// Restore the session's committed state from a snapshot
    pub fn import_from_persistence(&mut self, snapshot: &crate::persistence::Snapshot) {
        self.repo.import_from_persistence(snapshot);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Activate a desk, optionally foregrounding a task
    ///
    /// Chains the previously active desk's deactivation into the same
    /// change-set; the two commit independently at ready.
    pub fn activate_desk(
        &mut self,
        desk: DeskId,
        foreground: Option<TaskId>,
        directory: &dyn TaskDirectory,
    ) -> PreparedTransition {
        self.activate_desk_inner(desk, foreground, None, directory)
    }

    fn activate_desk_inner(
        &mut self,
        desk: DeskId,
        foreground: Option<TaskId>,
        foreground_bounds: Option<Bounds>,
        directory: &dyn TaskDirectory,
    ) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(d) = self.repo.desk(desk) else {
            warn!(desk, "activate_desk: desk not found");
            return prepared;
        };
        let display = d.display;

        // Deactivation of the old desk is constructed first so its
        // callback runs before the dependent activation commits.
        if let Some(prev) = self.repo.active_desk_id(display) {
            if prev != desk {
                prepared.push(
                    DeskChangeOp::DeactivateDesk { desk: prev },
                    Some(PendingIntent::Deactivate { desk: prev, display }),
                );
            }
        }

        prepared.push(
            DeskChangeOp::ActivateDesk { desk },
            Some(PendingIntent::Activate {
                desk,
                display,
                foreground,
                foreground_bounds,
                foreground_app: None,
            }),
        );

        // Reorder or relaunch the desk's tasks to the front, back first
        // so the front of the order ends up on top.
        let expanded = self.repo.expanded_tasks_ordered(desk);
        for &task in expanded.iter().rev().filter(|t| Some(**t) != foreground) {
            if directory.is_running(task) {
                prepared.push(DeskChangeOp::ReorderToFront { task }, None);
            } else {
                prepared.push(DeskChangeOp::LaunchTask { task }, None);
            }
        }
        if let Some(task) = foreground {
            prepared.push(DeskChangeOp::ReorderToFront { task }, None);
        }
        // The transparent overlay stays above everything on the desk.
        if let Some(overlay) = self.repo.top_overlay(desk).filter(|t| Some(*t) != foreground) {
            prepared.push(DeskChangeOp::ReorderToFront { task: overlay }, None);
        }

        let candidate = foreground.map(|t| {
            if expanded.contains(&t) {
                FrontCandidate::ExistingTask(t)
            } else {
                // Entering from another desk: counts like a new task.
                FrontCandidate::NewTask
            }
        });
        if let Some(victim) = self.limiter.task_to_minimize(&expanded, candidate, directory) {
            debug!(desk, task = victim, "task limit exceeded on activation");
            prepared.push(
                DeskChangeOp::MinimizeTask { task: victim },
                Some(PendingIntent::Minimize { desk, task: victim }),
            );
        }
        prepared
    }

    /// Mark a desk inactive if multi-desk is enabled and the desk exists
    pub fn deactivate_desk_if_needed(&mut self, desk: DeskId) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        if !self.policy.multi_desk_enabled() {
            return prepared;
        }
        let Some(d) = self.repo.desk(desk) else {
            debug!(desk, "deactivate_desk_if_needed: desk not found");
            return prepared;
        };
        let display = d.display;
        prepared.push(
            DeskChangeOp::DeactivateDesk { desk },
            Some(PendingIntent::Deactivate { desk, display }),
        );
        prepared
    }

    /// Move a task into a desk, activating the desk with the task in
    /// front
    ///
    /// Placement bounds inherit from a same-app closing instance in the
    /// target desk when one exists, else cascade from the desk's
    /// expanded count.
    pub fn move_task_to_desk(
        &mut self,
        task: TaskId,
        desk: DeskId,
        directory: &dyn TaskDirectory,
    ) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(membership) = self.repo.membership(task) else {
            warn!(task, desk, "move_task_to_desk: task not found");
            return prepared;
        };
        let app_id = membership.app_id.clone();
        if self.repo.desk(desk).is_none() {
            warn!(task, desk, "move_task_to_desk: desk not found");
            return prepared;
        }

        let bounds = self
            .inherited_bounds(desk, task, &app_id)
            .unwrap_or_else(|| self.cascade_bounds(desk));

        prepared.push(DeskChangeOp::ReparentTask { task, desk, bounds }, None);
        if let Some(dpi) = self.density_override {
            prepared.push(DeskChangeOp::SetTaskDensity { task, dpi }, None);
        }
        prepared.extend(self.activate_desk_inner(desk, Some(task), Some(bounds), directory));
        prepared
    }

    /// Bounds of a closing same-app instance already in the target desk
    fn inherited_bounds(&self, desk: DeskId, task: TaskId, app_id: &str) -> Option<Bounds> {
        let d = self.repo.desk(desk)?;
        d.expanded_tasks()
            .iter()
            .chain(d.minimized_tasks())
            .filter(|t| **t != task)
            .filter_map(|t| self.repo.membership(*t))
            .find(|m| m.closing && m.app_id == app_id)
            .map(|m| m.bounds)
    }

    /// Cascaded placement from the desk's expanded count
    fn cascade_bounds(&self, desk: DeskId) -> Bounds {
        let count = self
            .repo
            .desk(desk)
            .map(|d| d.expanded_tasks().len() as i32)
            .unwrap_or(0);
        let slot = count % CASCADE_SLOTS;
        DEFAULT_TASK_BOUNDS.offset(slot * CASCADE_STEP, slot * CASCADE_STEP)
    }

    /// Minimize a task
    ///
    /// Explicit minimize is unconditional; only limit-driven minimize is
    /// conditional on exceeding capacity. When the task is the desk's
    /// last visible task and the mode policy exits an emptied desktop,
    /// the desk's deactivation is chained as an exit-cleanup sub-change.
    pub fn minimize_task(&mut self, task: TaskId, reason: MinimizeReason) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(desk) = self.repo.desk_id_for_task(task) else {
            warn!(task, "minimize_task: task not found");
            return prepared;
        };
        let display = self.repo.desk(desk).map(|d| d.display).unwrap_or_default();
        debug!(task, desk, ?reason, "minimize requested");

        let last_visible = self.repo.expanded_tasks_ordered(desk) == [task];
        if last_visible && self.repo.is_desk_active(desk) && self.policy.deactivate_when_emptied() {
            prepared.push(
                DeskChangeOp::DeactivateDesk { desk },
                Some(PendingIntent::Deactivate { desk, display }),
            );
        }

        prepared.push(
            DeskChangeOp::MinimizeTask { task },
            Some(PendingIntent::Minimize { desk, task }),
        );
        prepared
    }

    /// Bring a minimized task back to its desk's expanded order
    pub fn unminimize_task(&mut self, task: TaskId) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(desk) = self.repo.desk_id_for_task(task) else {
            warn!(task, "unminimize_task: task not found");
            return prepared;
        };
        prepared.push(
            DeskChangeOp::UnminimizeTask { task },
            Some(PendingIntent::Unminimize { desk, task }),
        );
        prepared
    }

    /// Maximize a task to the given bounds
    ///
    /// The task's current placement is saved at ready so a later restore
    /// can bring it back.
    pub fn maximize_task(&mut self, task: TaskId, bounds: Bounds) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(desk) = self.repo.desk_id_for_task(task) else {
            warn!(task, "maximize_task: task not found");
            return prepared;
        };
        prepared.push(
            DeskChangeOp::ReparentTask { task, desk, bounds },
            Some(PendingIntent::Maximize { desk, task, bounds }),
        );
        prepared
    }

    /// Restore a maximized task to its saved placement
    ///
    /// A logged no-op when the task has no saved pre-maximize bounds.
    pub fn restore_task(&mut self, task: TaskId) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(desk) = self.repo.desk_id_for_task(task) else {
            warn!(task, "restore_task: task not found");
            return prepared;
        };
        let Some(bounds) = self.repo.pre_maximize_bounds(task) else {
            debug!(task, desk, "restore_task: no saved placement");
            return prepared;
        };
        prepared.push(
            DeskChangeOp::ReparentTask { task, desk, bounds },
            Some(PendingIntent::Unmaximize { desk, task }),
        );
        prepared
    }

    /// Record the desk's transparent top overlay task
    ///
    /// An observed platform fact, recorded directly; activations keep the
    /// overlay reordered above the desk's tasks.
    pub fn set_top_overlay(&mut self, desk: DeskId, task: Option<TaskId>) {
        self.repo.set_top_overlay(desk, task);
    }

    /// Remove a desk and everything it owns
    ///
    /// Removal ops are issued for running tasks; the RemoveDesk intent
    /// carries the full task set so membership cleanup commits in one
    /// step at ready.
    pub fn remove_desk(
        &mut self,
        desk: DeskId,
        directory: &dyn TaskDirectory,
    ) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(d) = self.repo.desk(desk) else {
            warn!(desk, "remove_desk: desk not found");
            return prepared;
        };
        let display = d.display;
        let tasks: Vec<TaskId> = d
            .expanded_tasks()
            .iter()
            .copied()
            .chain(d.minimized_tasks().iter().copied())
            .collect();

        for &task in tasks.iter().filter(|t| directory.is_running(**t)) {
            prepared.push(DeskChangeOp::RemoveTask { task }, None);
        }
        prepared.push(
            DeskChangeOp::RemoveDesk { desk },
            Some(PendingIntent::RemoveDesk { desk, display, tasks }),
        );
        prepared
    }

    /// Reorder a task to the front of its desk, running the limiter over
    /// the resulting order
    pub fn move_task_to_front(
        &mut self,
        task: TaskId,
        directory: &dyn TaskDirectory,
    ) -> PreparedTransition {
        let Some(desk) = self.repo.desk_id_for_task(task) else {
            warn!(task, "move_task_to_front: task not found");
            return PreparedTransition::default();
        };
        self.activate_desk_inner(desk, Some(task), None, directory)
    }

    /// A task opened into a desk: record membership and enforce the
    /// task limit
    ///
    /// Membership creation is an observed platform fact and mutates the
    /// repository directly; only the limit-driven minimize goes through
    /// the transition pipeline.
    pub fn on_task_opened(
        &mut self,
        task: TaskId,
        desk: DeskId,
        app_id: &str,
        bounds: Bounds,
        directory: &dyn TaskDirectory,
    ) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        if self.repo.desk(desk).is_none() {
            warn!(task, desk, "on_task_opened: desk not found");
            return prepared;
        }

        let expanded = self.repo.expanded_tasks_ordered(desk);
        // A task already in the expanded order just comes to the front.
        let candidate = if expanded.contains(&task) {
            FrontCandidate::ExistingTask(task)
        } else {
            FrontCandidate::NewTask
        };
        let victim = self.limiter.task_to_minimize(&expanded, Some(candidate), directory);

        self.repo.add_task_to_desk(task, desk, app_id, bounds);

        if let Some(victim) = victim {
            debug!(desk, task = victim, "task limit exceeded on open");
            prepared.push(
                DeskChangeOp::MinimizeTask { task: victim },
                Some(PendingIntent::Minimize { desk, task: victim }),
            );
        }
        prepared
    }

    /// A task closed: drop membership, then repair or deactivate the
    /// desk as its state machine requires
    pub fn on_task_closed(&mut self, task: TaskId) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let Some(desk) = self.repo.desk_id_for_task(task) else {
            debug!(task, "on_task_closed: no membership");
            return prepared;
        };
        let display = self.repo.desk(desk).map(|d| d.display).unwrap_or_default();
        self.repo.remove_task(task);

        let emptied = self.repo.expanded_tasks_ordered(desk).is_empty();
        if emptied && self.repo.is_desk_active(desk) && self.policy.deactivate_when_emptied() {
            prepared.push(
                DeskChangeOp::DeactivateDesk { desk },
                Some(PendingIntent::Deactivate { desk, display }),
            );
        }
        prepared.extend(reconcile::reconcile_leftover_minimized(
            &mut self.repo,
            display,
        ));
        prepared
    }

    /// A display disconnected: re-home its desks onto `fallback`, or
    /// tear them down when no display remains
    pub fn remove_display(
        &mut self,
        display: DisplayId,
        fallback: Option<DisplayId>,
    ) -> PreparedTransition {
        let mut prepared = PreparedTransition::default();
        let desks: Vec<DeskId> = self.repo.desks_on_display(display).map(|d| d.id).collect();
        if desks.is_empty() {
            return prepared;
        }

        match fallback {
            Some(to_display) => {
                for desk in desks {
                    prepared.push(
                        DeskChangeOp::DeactivateDesk { desk },
                        Some(PendingIntent::ChangeDeskDisplay { desk, to_display }),
                    );
                }
            }
            None => {
                for &desk in &desks {
                    let tasks: Vec<TaskId> = self
                        .repo
                        .desk(desk)
                        .map(|d| {
                            d.expanded_tasks()
                                .iter()
                                .copied()
                                .chain(d.minimized_tasks().iter().copied())
                                .collect()
                        })
                        .unwrap_or_default();
                    for task in tasks {
                        prepared.push(DeskChangeOp::RemoveTask { task }, None);
                    }
                    prepared.push(DeskChangeOp::RemoveDesk { desk }, None);
                }
                prepared.intents.push(PendingIntent::RemoveDisplay { display, desks });
            }
        }
        prepared
    }

    /// Repair pass: remove orphaned minimized tasks once a display's
    /// expanded set has emptied
    pub fn reconcile_display(&mut self, display: DisplayId) -> PreparedTransition {
        reconcile::reconcile_leftover_minimized(&mut self.repo, display)
    }

    // =========================================================================
    // Transition lifecycle
    // =========================================================================

    /// Bind a prepared transition to the token the pipeline returned
    pub fn bind(&mut self, prepared: PreparedTransition, token: TransitionToken) {
        prepared.bind(token, &mut self.coordinator);
    }

    /// Submit a prepared transition to the pipeline and bind the token
    ///
    /// Empty proposals are discarded without touching the pipeline.
    pub fn submit(
        &mut self,
        prepared: PreparedTransition,
        pipeline: &mut dyn TransitionPipeline,
    ) -> Option<TransitionToken> {
        if prepared.is_empty() {
            return None;
        }
        let token = pipeline.start(prepared.ops.clone());
        self.bind(prepared, token);
        Some(token)
    }

    /// The pipeline validated a transition as ready
    pub fn on_transition_ready(&mut self, token: TransitionToken, change: &ReadyChange) {
        self.coordinator
            .on_transition_ready(token, change, &mut self.repo);
    }

    /// The pipeline merged one transition into another
    pub fn on_transition_merged(&mut self, old: TransitionToken, new: TransitionToken) {
        self.coordinator.on_transition_merged(old, new, &mut self.repo);
    }

    /// The pipeline finished (or aborted) a transition
    pub fn on_transition_finished(&mut self, token: TransitionToken, aborted: bool) {
        self.coordinator.on_transition_finished(token, aborted);
    }

    /// Coordinator queries, mostly for the embedder and tests
    pub fn coordinator(&self) -> &TransitionCoordinator {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::task::AllRunning;
    use crate::transition::TaskReadyMode;
    use super::*;

    fn organizer_with_desk() -> DeskOrganizer {
        let mut org = DeskOrganizer::new(0, &DeskConfig::default()).unwrap();
        org.register_desk(1, 0);
        org
    }

    fn ready_all_hidden(tasks: &[TaskId]) -> ReadyChange {
        tasks
            .iter()
            .fold(ReadyChange::new(), |c, t| c.with_task(*t, TaskReadyMode::ToBack))
    }

    #[test]
    fn test_activation_chains_old_desk_deactivation() {
        let mut org = organizer_with_desk();
        org.register_desk(2, 0);
        let prepared = org.activate_desk(1, None, &AllRunning);
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ReadyChange::new());
        assert_eq!(org.active_desk_id(0), Some(1));

        let prepared = org.activate_desk(2, None, &AllRunning);
        assert_eq!(
            prepared.ops()[0],
            DeskChangeOp::DeactivateDesk { desk: 1 }
        );
        assert_eq!(prepared.ops()[1], DeskChangeOp::ActivateDesk { desk: 2 });
        org.bind(prepared, 101);
        org.on_transition_ready(101, &ReadyChange::new());

        assert_eq!(org.active_desk_id(0), Some(2));
        assert!(!org.is_desk_active(1));
    }

    #[test]
    fn test_discarded_proposal_has_no_side_effects() {
        let mut org = organizer_with_desk();
        let prepared = org.activate_desk(1, None, &AllRunning);
        assert!(!prepared.is_empty());
        drop(prepared);
        assert_eq!(org.active_desk_id(0), None);
        assert!(org.coordinator().is_idle());
    }

    #[test]
    fn test_open_over_limit_minimizes_back_task() {
        let config = DeskConfig {
            task_limit: Some(6),
            ..Default::default()
        };
        let mut org = DeskOrganizer::new(0, &config).unwrap();
        org.register_desk(1, 0);
        for task in 1..=6 {
            let p = org.on_task_opened(task, 1, "app", Bounds::ZERO, &AllRunning);
            assert!(p.is_empty());
        }

        let prepared = org.on_task_opened(7, 1, "app", Bounds::ZERO, &AllRunning);
        assert_eq!(
            prepared.ops(),
            &[DeskChangeOp::MinimizeTask { task: 1 }]
        );
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ready_all_hidden(&[1]));

        assert_eq!(org.expanded_tasks_ordered(1), vec![7, 6, 5, 4, 3, 2]);
        assert!(org.is_minimized_task(1));
    }

    #[test]
    fn test_explicit_minimize_is_unconditional() {
        let mut org = organizer_with_desk();
        org.on_task_opened(10, 1, "app", Bounds::ZERO, &AllRunning);
        org.on_task_opened(11, 1, "app", Bounds::ZERO, &AllRunning);

        let prepared = org.minimize_task(10, MinimizeReason::UserInitiated);
        assert_eq!(prepared.ops(), &[DeskChangeOp::MinimizeTask { task: 10 }]);
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ready_all_hidden(&[10]));
        assert!(org.is_minimized_task(10));
    }

    #[test]
    fn test_minimizing_last_visible_task_exits_desktop() {
        let config = DeskConfig {
            multi_desk: false,
            ..Default::default()
        };
        let mut org = DeskOrganizer::new(0, &config).unwrap();
        org.register_desk(1, 0);
        org.on_task_opened(10, 1, "app", Bounds::ZERO, &AllRunning);
        let p = org.activate_desk(1, None, &AllRunning);
        org.bind(p, 100);
        org.on_transition_ready(100, &ReadyChange::new());

        let prepared = org.minimize_task(10, MinimizeReason::UserInitiated);
        assert_eq!(
            prepared.ops()[0],
            DeskChangeOp::DeactivateDesk { desk: 1 }
        );
        org.bind(prepared, 101);
        org.on_transition_ready(101, &ready_all_hidden(&[10]));

        assert!(org.is_minimized_task(10));
        assert_eq!(org.active_desk_id(0), None);
    }

    #[test]
    fn test_minimizing_hidden_task_does_not_exit_desktop() {
        let config = DeskConfig {
            multi_desk: false,
            ..Default::default()
        };
        let mut org = DeskOrganizer::new(0, &config).unwrap();
        org.register_desk(1, 0);
        org.on_task_opened(10, 1, "app", Bounds::ZERO, &AllRunning);
        let p = org.activate_desk(1, None, &AllRunning);
        org.bind(p, 100);
        org.on_transition_ready(100, &ReadyChange::new());

        // The task hides out of band; the desk stays active.
        org.repo.set_task_minimized(10, true);
        assert_eq!(org.active_desk_id(0), Some(1));

        let prepared = org.minimize_task(10, MinimizeReason::UserInitiated);
        assert_eq!(prepared.ops(), &[DeskChangeOp::MinimizeTask { task: 10 }]);
    }

    #[test]
    fn test_reopening_expanded_task_is_not_a_new_task() {
        let config = DeskConfig {
            task_limit: Some(2),
            ..Default::default()
        };
        let mut org = DeskOrganizer::new(0, &config).unwrap();
        org.register_desk(1, 0);
        org.on_task_opened(1, 1, "app", Bounds::ZERO, &AllRunning);
        org.on_task_opened(2, 1, "app", Bounds::ZERO, &AllRunning);

        // At capacity: re-announcing a member must not pick a victim.
        let prepared = org.on_task_opened(2, 1, "app", Bounds::ZERO, &AllRunning);
        assert!(prepared.is_empty());
        assert_eq!(org.expanded_tasks_ordered(1), vec![2, 1]);
    }

    #[test]
    fn test_maximize_then_restore_round_trips_placement() {
        let mut org = organizer_with_desk();
        let placed = Bounds::new(40, 40, 400, 300);
        org.on_task_opened(10, 1, "app", placed, &AllRunning);

        let full = Bounds::new(0, 0, 1920, 1080);
        let prepared = org.maximize_task(10, full);
        assert_eq!(
            prepared.ops(),
            &[DeskChangeOp::ReparentTask { task: 10, desk: 1, bounds: full }]
        );
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ReadyChange::new());
        assert_eq!(org.repository().membership(10).unwrap().bounds, full);

        let prepared = org.restore_task(10);
        org.bind(prepared, 101);
        org.on_transition_ready(101, &ReadyChange::new());
        assert_eq!(org.repository().membership(10).unwrap().bounds, placed);

        // The saved placement was consumed.
        assert!(org.restore_task(10).is_empty());
    }

    #[test]
    fn test_activation_keeps_overlay_on_top() {
        let mut org = organizer_with_desk();
        org.on_task_opened(10, 1, "app", Bounds::ZERO, &AllRunning);
        org.on_task_opened(11, 1, "overlay", Bounds::ZERO, &AllRunning);
        org.set_top_overlay(1, Some(11));

        let prepared = org.activate_desk(1, Some(10), &AllRunning);
        assert_eq!(
            prepared.ops().last(),
            Some(&DeskChangeOp::ReorderToFront { task: 11 })
        );
    }

    #[test]
    fn test_move_inherits_bounds_from_closing_same_app_instance() {
        let mut org = organizer_with_desk();
        org.register_desk(2, 0);
        org.on_task_opened(10, 1, "editor", Bounds::ZERO, &AllRunning);
        org.on_task_opened(20, 2, "editor", Bounds::new(300, 200, 800, 600), &AllRunning);
        org.repo.set_task_closing(20, true);

        let prepared = org.move_task_to_desk(10, 2, &AllRunning);
        assert_eq!(
            prepared.ops()[0],
            DeskChangeOp::ReparentTask {
                task: 10,
                desk: 2,
                bounds: Bounds::new(300, 200, 800, 600),
            }
        );
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ReadyChange::new());

        assert_eq!(org.desk_id_for_task(10), Some(2));
        assert_eq!(org.active_desk_id(0), Some(2));
        assert_eq!(
            org.repository().membership(10).unwrap().bounds,
            Bounds::new(300, 200, 800, 600)
        );
    }

    #[test]
    fn test_move_without_instance_cascades_placement() {
        let mut org = organizer_with_desk();
        org.register_desk(2, 0);
        org.on_task_opened(10, 1, "a", Bounds::ZERO, &AllRunning);
        org.on_task_opened(20, 2, "b", Bounds::ZERO, &AllRunning);

        let prepared = org.move_task_to_desk(10, 2, &AllRunning);
        let expected = DEFAULT_TASK_BOUNDS.offset(CASCADE_STEP, CASCADE_STEP);
        assert_eq!(
            prepared.ops()[0],
            DeskChangeOp::ReparentTask { task: 10, desk: 2, bounds: expected }
        );
    }

    #[test]
    fn test_remove_desk_clears_all_membership_at_ready() {
        let mut org = organizer_with_desk();
        org.on_task_opened(7, 1, "app", Bounds::ZERO, &AllRunning);
        org.on_task_opened(8, 1, "app", Bounds::ZERO, &AllRunning);

        let prepared = org.remove_desk(1, &AllRunning);
        assert!(prepared.ops().contains(&DeskChangeOp::RemoveTask { task: 7 }));
        assert!(prepared.ops().contains(&DeskChangeOp::RemoveTask { task: 8 }));
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ReadyChange::new());
        org.on_transition_finished(100, false);

        assert_eq!(org.desk_id_for_task(7), None);
        assert_eq!(org.desk_id_for_task(8), None);
        assert!(org.all_desk_ids().is_empty());
        assert!(org.coordinator().is_idle());
    }

    #[test]
    fn test_remove_display_rehomes_desks() {
        let mut org = organizer_with_desk();
        org.register_desk(2, 1);

        let prepared = org.remove_display(0, Some(1));
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ReadyChange::new());

        assert_eq!(org.repository().desk(1).unwrap().display, 1);
    }

    #[test]
    fn test_remove_display_without_fallback_tears_down() {
        let mut org = organizer_with_desk();
        org.on_task_opened(10, 1, "app", Bounds::ZERO, &AllRunning);

        let prepared = org.remove_display(0, None);
        org.bind(prepared, 100);
        org.on_transition_ready(100, &ReadyChange::new());

        assert!(org.all_desk_ids().is_empty());
        assert_eq!(org.desk_id_for_task(10), None);
    }

    #[test]
    fn test_remove_display_tears_down_minimized_tasks() {
        let mut org = organizer_with_desk();
        org.on_task_opened(10, 1, "app", Bounds::ZERO, &AllRunning);
        org.on_task_opened(11, 1, "app", Bounds::ZERO, &AllRunning);
        let p = org.minimize_task(11, MinimizeReason::UserInitiated);
        org.bind(p, 100);
        org.on_transition_ready(100, &ready_all_hidden(&[11]));

        let prepared = org.remove_display(0, None);
        assert!(prepared.ops().contains(&DeskChangeOp::RemoveTask { task: 10 }));
        assert!(prepared.ops().contains(&DeskChangeOp::RemoveTask { task: 11 }));
    }

    #[test]
    fn test_can_create_desks_respects_mode_policy() {
        let config = DeskConfig {
            multi_desk: false,
            ..Default::default()
        };
        let mut org = DeskOrganizer::new(0, &config).unwrap();
        assert!(org.can_create_desks(0));
        org.register_desk(1, 0);
        assert!(!org.can_create_desks(0));
    }

    proptest! {
        // The expanded count stays within the limit across any sequence
        // of task opens, as long as each limit minimize commits.
        #[test]
        fn prop_expanded_count_never_exceeds_limit(
            tasks in proptest::collection::vec(1u64..200, 1..30),
            limit in 1usize..6,
        ) {
            let config = DeskConfig {
                task_limit: Some(limit),
                ..Default::default()
            };
            let mut org = DeskOrganizer::new(0, &config).unwrap();
            org.register_desk(1, 0);

            let mut token = 0;
            for task in tasks {
                let prepared = org.on_task_opened(task, 1, "app", Bounds::ZERO, &AllRunning);
                if !prepared.is_empty() {
                    let victim = match prepared.ops().first() {
                        Some(DeskChangeOp::MinimizeTask { task }) => *task,
                        other => {
                            prop_assert!(false, "unexpected op {other:?}");
                            unreachable!()
                        }
                    };
                    token += 1;
                    org.bind(prepared, token);
                    org.on_transition_ready(token, &ready_all_hidden(&[victim]));
                    org.on_transition_finished(token, false);
                }
                prop_assert!(org.expanded_tasks_ordered(1).len() <= limit);
            }
        }
    }
}
