//! Leftover-minimized repair pass
//!
//! Minimize paths that bypass the transition coordinator (host-driven
//! removal, crashed processes) can leave minimized memberships behind
//! after every expanded task on a display is gone. Left alone those
//! entries are permanently stuck: nothing will ever unminimize them.
//! This pass detects the condition and produces a cleanup change-set
//! fully removing each orphan.

use tracing::info;

use crate::desk::{DeskRepository, DisplayId};
use crate::organizer::PreparedTransition;
use crate::task::TaskId;
use crate::transition::DeskChangeOp;

/// Remove orphaned minimized tasks once a display's expanded set
/// has emptied
///
/// No-op while any desk on the display still has an expanded task.
/// Membership cleanup is applied directly; the returned ops only tear
/// down the orphans' surfaces, so the change-set carries no intents
/// and discarding it leaves the repository consistent.
pub(crate) fn reconcile_leftover_minimized(
    repo: &mut DeskRepository,
    display: DisplayId,
) -> PreparedTransition {
    let mut prepared = PreparedTransition::default();

    let mut orphans: Vec<TaskId> = Vec::new();
    for desk in repo.desks_on_display(display) {
        if !desk.expanded_tasks().is_empty() {
            return prepared;
        }
        orphans.extend(desk.minimized_tasks().iter().copied());
    }
    if orphans.is_empty() {
        return prepared;
    }

    // Aliased: a local named `display` inside tracing macros collides
    // with `tracing::field::display`.
    let display_id = display;
    info!(
        display = display_id,
        count = orphans.len(),
        "removing leftover minimized tasks"
    );
    for task in orphans {
        repo.remove_task(task);
        prepared.push(DeskChangeOp::RemoveTask { task }, None);
    }
    prepared
}
