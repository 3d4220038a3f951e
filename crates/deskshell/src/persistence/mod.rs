//! Session persistence
//!
//! Serializable snapshot of a user's committed desk state plus the
//! storage trait an embedder implements to back it.

mod snapshot;

pub use snapshot::{PersistedDesk, Snapshot};

use crate::desk::UserId;
use crate::error::DeskResult;

/// Storage backend for per-user desk snapshots
pub trait DeskPersistence {
    /// Persist a snapshot for a user
    fn save(&mut self, user: UserId, snapshot: &Snapshot) -> DeskResult<()>;

    /// Load the stored snapshot for a user, `None` when absent
    fn load(&mut self, user: UserId) -> DeskResult<Option<Snapshot>>;
}
