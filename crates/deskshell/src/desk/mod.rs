//! Desk (virtual workspace) management module
//!
//! Provides the desk data model and the per-session repository that is
//! the canonical record of desks, task membership, and active desks.

mod desk;
mod repository;

pub use desk::{Desk, OverlayRecord};
pub use repository::DeskRepository;

/// Unique desk identifier, assigned by the desk backend and never reused
pub type DeskId = u32;

/// External display identifier
pub type DisplayId = u64;

/// User session identifier
pub type UserId = u32;
