//! Task directory collaborator

use super::TaskId;

/// Lookup into the platform's task table
///
/// The limiter re-checks candidates against this before selecting a
/// victim, and desk removal consults it to decide whether a task still
/// has a running surface to tear down.
pub trait TaskDirectory {
    /// Whether the task is currently running (not merely backgrounded)
    fn is_running(&self, task: TaskId) -> bool;
}

/// Directory that reports every task as running
///
/// Useful for tests and for embedders without a task table.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllRunning;

impl TaskDirectory for AllRunning {
    fn is_running(&self, _task: TaskId) -> bool {
        true
    }
}
