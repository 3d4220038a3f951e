//! Task membership and per-desk capacity policy
//!
//! Tasks are application windows; the repository tracks which desk each
//! task belongs to, and the limiter decides which task to minimize when
//! a desk exceeds its expanded-task capacity.

mod directory;
mod limit;
mod membership;

pub use directory::{AllRunning, TaskDirectory};
pub use limit::{FrontCandidate, TaskLimiter};
pub use membership::{MinimizeReason, TaskMembership};

/// Unique task identifier
pub type TaskId = u64;
