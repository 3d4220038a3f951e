//! Desk session management for windowing shells
//!
//! This crate provides the core desk (virtual workspace) state machine
//! a windowing shell builds on:
//! - Per-user desk sessions with one active desk per display
//! - Expanded/minimized task bookkeeping with front-to-back ordering
//! - A task-limit policy engine with LRU minimization
//! - Transition-token coordination: repository mutations commit only
//!   when the external transition pipeline validates a change as ready
//! - A repair pass for minimized tasks orphaned by paths that bypass
//!   the coordinator
//!
//! ## Architecture
//!
//! The crate is organized into focused modules:
//!
//! - [`bounds`]: Integer window geometry
//! - [`desk`]: Desk data model and the per-session repository
//! - [`task`]: Task membership, the running-state directory, and the
//!   task-limit policy engine
//! - [`transition`]: Pending-intent coordination over transition tokens
//! - [`organizer`]: Lifecycle orchestrator sequencing multi-step
//!   operations into change-sets
//! - [`session`]: Per-user session registry and async desk creation
//! - [`persistence`]: State serialization for storage
//!
//! ## Example
//!
//! ```rust
//! use deskshell::{AllRunning, DeskConfig, DeskOrganizer, ReadyChange};
//!
//! let mut organizer = DeskOrganizer::new(0, &DeskConfig::default()).unwrap();
//! organizer.register_desk(1, 0);
//!
//! // Build a change-set, hand its ops to the transition pipeline,
//! // then bind the token the pipeline returned.
//! let prepared = organizer.activate_desk(1, None, &AllRunning);
//! organizer.bind(prepared, 42);
//!
//! // Nothing commits until the pipeline reports the token ready.
//! assert_eq!(organizer.active_desk_id(0), None);
//! organizer.on_transition_ready(42, &ReadyChange::new());
//! assert_eq!(organizer.active_desk_id(0), Some(1));
//! ```
//!
//! ## Design Principles
//!
//! 1. **Single Sequencing Context**: all mutation happens on one
//!    context, so the core state machine needs no internal locking
//! 2. **Commit at Ready**: change-sets are proposals; state changes
//!    only when the pipeline validates them, and a discarded proposal
//!    has no side effects
//! 3. **Pure Policy**: limit decisions are pure functions over ordered
//!    task lists, testable in isolation
//! 4. **Explicit Sessions**: per-user state lives in an explicit
//!    registry, never in ambient singletons

pub mod bounds;
pub mod config;
pub mod desk;
pub mod events;
pub mod organizer;
pub mod persistence;
pub mod session;
pub mod task;
pub mod transition;

mod error;
mod reconcile;

pub use bounds::Bounds;
pub use config::{DeskConfig, DEFAULT_MAX_DESKS_PER_DISPLAY};
pub use desk::{Desk, DeskId, DeskRepository, DisplayId, UserId};
pub use error::{DeskError, DeskResult};
pub use events::DeskEvent;
pub use organizer::{DeskOrganizer, PreparedTransition};
pub use persistence::{DeskPersistence, PersistedDesk, Snapshot};
pub use session::{DeskBackend, SessionRegistry};
pub use task::{
    AllRunning, FrontCandidate, MinimizeReason, TaskDirectory, TaskId, TaskLimiter,
    TaskMembership,
};
pub use transition::{
    DeskChangeOp, PendingIntent, ReadyChange, TaskReadyMode, TransitionCoordinator,
    TransitionPipeline, TransitionToken,
};
