//! Task-limit policy: which task to minimize when a desk is over capacity

use crate::error::{DeskError, DeskResult};
use super::{TaskDirectory, TaskId};

/// The task about to take the front position, if any
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontCandidate {
    /// An already-open task is being brought to the front
    ExistingTask(TaskId),
    /// A brand-new task is opening into the front position
    NewTask,
}

/// Pure policy deciding which task must be minimized for a desk to stay
/// within its expanded-task limit
///
/// Selection is purely positional over the front-to-back order; the only
/// secondary check is that the selected task is still running.
#[derive(Clone, Copy, Debug)]
pub struct TaskLimiter {
    limit: Option<usize>,
}

impl TaskLimiter {
    /// Create a limiter; `None` means unlimited, `Some(0)` is rejected
    pub fn new(limit: Option<usize>) -> DeskResult<Self> {
        if limit == Some(0) {
            return Err(DeskError::InvalidConfiguration(
                "task limit must be at least 1".to_string(),
            ));
        }
        Ok(Self { limit })
    }

    /// A limiter that never minimizes
    pub fn unlimited() -> Self {
        Self { limit: None }
    }

    /// The configured limit
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Decide which task (if any) must be minimized
    ///
    /// `expanded` is the desk's current front-to-back order and
    /// `candidate` the task about to occupy the front. Returns the task
    /// at the back of the resulting order, skipping tasks the directory
    /// no longer reports as running.
    pub fn task_to_minimize(
        &self,
        expanded: &[TaskId],
        candidate: Option<FrontCandidate>,
        directory: &dyn TaskDirectory,
    ) -> Option<TaskId> {
        let limit = self.limit?;
        let opening = matches!(candidate, Some(FrontCandidate::NewTask)) as usize;
        if expanded.len() + opening <= limit {
            return None;
        }

        // Conceptually move the candidate to position 0 before picking
        // the back of the list.
        let mut order: Vec<TaskId> = expanded.to_vec();
        if let Some(FrontCandidate::ExistingTask(front)) = candidate {
            order.retain(|t| *t != front);
            order.insert(0, front);
        }
        Self::last_running(&order, directory)
    }

    /// Back-most running task, retrying over the remaining list when the
    /// back task is no longer running
    fn last_running(order: &[TaskId], directory: &dyn TaskDirectory) -> Option<TaskId> {
        let (&back, rest) = order.split_last()?;
        if directory.is_running(back) {
            Some(back)
        } else {
            Self::last_running(rest, directory)
        }
    }
}
