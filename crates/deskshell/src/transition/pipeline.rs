//! Transition pipeline collaborator

use super::change::DeskChangeOp;
use super::TransitionToken;

/// The external, asynchronous transition pipeline
///
/// `start` accepts a change-set and returns the token under which the
/// pipeline will later report `ready`, `merged`, and `finished`. The
/// embedder dispatches those reports onto the sequencing context and
/// forwards them to the coordinator.
pub trait TransitionPipeline {
    /// Submit a change-set, receiving the token that identifies it
    fn start(&mut self, ops: Vec<DeskChangeOp>) -> TransitionToken;
}
