//! Per-token transition state machine

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::bounds::Bounds;
use crate::desk::DeskRepository;
use super::change::ReadyChange;
use super::intent::PendingIntent;
use super::TransitionToken;

/// Lifecycle phase of a tracked token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenPhase {
    /// Intents registered, transition not yet reported ready
    Pending,
    /// Ready was processed and any valid intents committed
    Active,
}

#[derive(Debug)]
struct TokenEntry {
    phase: TokenPhase,
    /// Intents awaiting a ready callback
    pending: Vec<PendingIntent>,
    /// Intents already applied to the repository; held for queries only
    committed: Vec<PendingIntent>,
    /// The change reported at ready, kept so late-merged intents can
    /// validate against it
    ready: Option<ReadyChange>,
}

impl TokenEntry {
    fn empty() -> Self {
        Self {
            phase: TokenPhase::Pending,
            pending: Vec::new(),
            committed: Vec::new(),
            ready: None,
        }
    }
}

/// Tracks pending bookkeeping intents per transition token and commits
/// them to the repository exactly once
///
/// Only the ready path mutates the repository. Finished and aborted
/// deliveries clean bookkeeping without un-committing, so each logical
/// operation mutates state at most once no matter how lifecycle
/// callbacks are duplicated or reordered across tokens.
#[derive(Debug, Default)]
pub struct TransitionCoordinator {
    entries: HashMap<TransitionToken, TokenEntry>,
}

impl TransitionCoordinator {
    /// Create an empty coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Register intents under a token
    ///
    /// Appends when the token is already tracked, which is how merged
    /// change-sets accumulate intents.
    pub fn register(
        &mut self,
        token: TransitionToken,
        intents: impl IntoIterator<Item = PendingIntent>,
    ) {
        self.entries
            .entry(token)
            .or_insert_with(TokenEntry::empty)
            .pending
            .extend(intents);
    }

    /// Whether a token has registered intents not yet committed
    pub fn has_pending_transition(&self, token: TransitionToken) -> bool {
        self.entries
            .get(&token)
            .is_some_and(|e| e.phase == TokenPhase::Pending)
    }

    /// Number of intents currently held for a token, committed or not
    pub fn pending_intent_count(&self, token: TransitionToken) -> usize {
        self.entries
            .get(&token)
            .map_or(0, |e| e.pending.len() + e.committed.len())
    }

    /// Whether any token is still tracked
    pub fn is_idle(&self) -> bool {
        self.entries.is_empty()
    }

    /// The transition was validated as ready: commit each intent that
    /// still holds against the reported change
    ///
    /// Intents validate and commit independently; one stale intent does
    /// not roll back its siblings. A second ready for the same token is
    /// ignored.
    pub fn on_transition_ready(
        &mut self,
        token: TransitionToken,
        change: &ReadyChange,
        repo: &mut DeskRepository,
    ) {
        let Some(entry) = self.entries.get_mut(&token) else {
            debug!(token, "ready for untracked transition");
            return;
        };
        if entry.phase == TokenPhase::Active {
            debug!(token, "duplicate ready ignored");
            return;
        }
        entry.phase = TokenPhase::Active;
        entry.ready = Some(change.clone());

        let intents = std::mem::take(&mut entry.pending);
        for intent in &intents {
            Self::commit(intent, change, repo);
        }
        entry.committed.extend(intents);
    }

    /// A token was merged into another: its uncommitted intents move
    /// under the new token
    ///
    /// Intents the old token already committed are carried for
    /// bookkeeping only and never replayed. When the destination already
    /// went ready, the moved intents validate against its recorded
    /// change right away instead of waiting for a ready that will not
    /// come again.
    pub fn on_transition_merged(
        &mut self,
        old: TransitionToken,
        new: TransitionToken,
        repo: &mut DeskRepository,
    ) {
        let Some(old_entry) = self.entries.remove(&old) else {
            return;
        };
        match self.entries.get_mut(&new) {
            Some(dest) => {
                dest.committed.extend(old_entry.committed);
                if dest.phase == TokenPhase::Active {
                    let change = dest.ready.clone().unwrap_or_default();
                    for intent in &old_entry.pending {
                        Self::commit(intent, &change, repo);
                    }
                    dest.committed.extend(old_entry.pending);
                } else {
                    dest.pending.extend(old_entry.pending);
                }
            }
            None => {
                self.entries.insert(new, old_entry);
            }
        }
    }

    /// The transition finished (or aborted before ready): discard the
    /// entry; committed state stays committed
    pub fn on_transition_finished(&mut self, token: TransitionToken, aborted: bool) {
        match self.entries.remove(&token) {
            Some(entry) if aborted && entry.phase == TokenPhase::Pending => {
                debug!(
                    token,
                    intents = entry.pending.len(),
                    "transition aborted before ready; intents dropped"
                );
            }
            Some(_) | None => {}
        }
    }

    fn commit(intent: &PendingIntent, change: &ReadyChange, repo: &mut DeskRepository) {
        match intent {
            PendingIntent::Activate {
                desk,
                display,
                foreground,
                foreground_bounds,
                foreground_app,
            } => {
                if repo.desk(*desk).is_none() {
                    // Aliased: a local named `display` inside tracing
                    // macros collides with `tracing::field::display`.
                    let display_id = *display;
                    warn!(desk, display = display_id, "activate: desk vanished before ready");
                    return;
                }
                if let Some(task) = *foreground {
                    let owner = repo.membership(task).map(|m| m.desk);
                    match owner {
                        Some(d) if d == *desk => {
                            if let Some(bounds) = *foreground_bounds {
                                if let Some(m) = repo.membership_mut(task) {
                                    m.bounds = bounds;
                                }
                            }
                            repo.move_task_to_front(task);
                        }
                        _ => {
                            // Reparent (or first-time placement) into the desk.
                            let app = foreground_app
                                .clone()
                                .or_else(|| repo.membership(task).map(|m| m.app_id.clone()))
                                .unwrap_or_default();
                            let bounds = foreground_bounds
                                .or_else(|| repo.membership(task).map(|m| m.bounds))
                                .unwrap_or(Bounds::ZERO);
                            repo.add_task_to_desk(task, *desk, &app, bounds);
                        }
                    }
                }
                repo.set_active_desk(*display, *desk);
            }
            PendingIntent::Deactivate { desk, display } => {
                repo.clear_active_desk(*display, *desk);
            }
            PendingIntent::Minimize { desk, task } => {
                let already_hidden = repo.membership(*task).is_some_and(|m| !m.visible);
                if change.task_goes_hidden(*task) || already_hidden {
                    repo.set_task_minimized(*task, true);
                } else {
                    // Expected under racing user input, e.g. a cancelled
                    // minimize drag reported the task back-to-front.
                    debug!(desk, task, "dropping stale minimize intent");
                }
            }
            PendingIntent::Unminimize { desk, task } => {
                if repo.desk_id_for_task(*task) != Some(*desk) {
                    debug!(desk, task, "unminimize: membership moved before ready");
                }
                repo.set_task_minimized(*task, false);
            }
            PendingIntent::Maximize { desk, task, bounds } => {
                if repo.desk_id_for_task(*task) != Some(*desk) {
                    debug!(desk, task, "maximize: membership moved before ready");
                    return;
                }
                repo.save_pre_maximize_bounds(*task);
                if let Some(m) = repo.membership_mut(*task) {
                    m.bounds = *bounds;
                }
                repo.move_task_to_front(*task);
            }
            PendingIntent::Unmaximize { desk, task } => {
                match repo.take_pre_maximize_bounds(*task) {
                    Some(bounds) => {
                        if let Some(m) = repo.membership_mut(*task) {
                            m.bounds = bounds;
                        }
                    }
                    None => debug!(desk, task, "restore: no saved placement"),
                }
            }
            PendingIntent::RemoveDesk { desk, tasks, .. } => {
                for task in tasks {
                    repo.remove_task(*task);
                }
                repo.remove_desk(*desk);
            }
            PendingIntent::ChangeDeskDisplay { desk, to_display } => {
                repo.set_desk_display(*desk, *to_display);
            }
            PendingIntent::RemoveDisplay { desks, .. } => {
                for desk in desks {
                    repo.remove_desk(*desk);
                }
            }
        }
    }
}
