//! Snapshot serialization for desk session state

use serde::{Deserialize, Serialize};

use crate::desk::{DeskId, DisplayId, UserId};
use crate::task::TaskId;

/// Persisted form of a single desk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedDesk {
    pub id: DeskId,
    pub display: DisplayId,
    /// Expanded tasks, front-to-back
    pub expanded: Vec<TaskId>,
    pub minimized: Vec<TaskId>,
}

/// Snapshot of one user's desk session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Version for migration support
    pub version: u32,
    pub user: UserId,
    pub desks: Vec<PersistedDesk>,
    /// Active desk pointer per display
    pub active: Vec<(DisplayId, DeskId)>,
}

impl Snapshot {
    /// Current snapshot version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(user: UserId, desks: Vec<PersistedDesk>, active: Vec<(DisplayId, DeskId)>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            user,
            desks,
            active,
        }
    }

    /// Check if snapshot needs migration
    pub fn needs_migration(&self) -> bool {
        self.version < Self::CURRENT_VERSION
    }

    /// Migrate snapshot to current version
    pub fn migrate(&mut self) {
        // Add migration logic as versions increase
        self.version = Self::CURRENT_VERSION;
    }
}
