//! Transition coordination module
//!
//! Desk/task mutations are proposed synchronously as change-sets, handed
//! to an external transition pipeline, and committed to the repository
//! only when the pipeline reports the transition ready. The coordinator
//! tracks per-token pending intents through ready/merged/finished.

mod change;
mod coordinator;
mod intent;
mod pipeline;

pub use change::{DeskChangeOp, ReadyChange, TaskReadyMode};
pub use coordinator::TransitionCoordinator;
pub use intent::PendingIntent;
pub use pipeline::TransitionPipeline;

/// Opaque transition token issued by the pipeline
pub type TransitionToken = u64;
