//! Session configuration and desk-mode strategy

use crate::desk::DisplayId;

/// Default maximum number of desks a display may hold
pub const DEFAULT_MAX_DESKS_PER_DISPLAY: usize = 4;

/// Configuration for a desk session
#[derive(Clone, Debug)]
pub struct DeskConfig {
    /// Maximum expanded tasks per desk; `None` means unlimited
    pub task_limit: Option<usize>,
    /// Whether multiple desks per display are available
    pub multi_desk: bool,
    /// Cap on desks per display when multi-desk is enabled
    pub max_desks_per_display: usize,
    /// Density (dpi) override applied to tasks moved into a desk
    pub density_override: Option<u32>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            task_limit: None,
            multi_desk: true,
            max_desks_per_display: DEFAULT_MAX_DESKS_PER_DISPLAY,
            density_override: None,
        }
    }
}

impl DeskConfig {
    /// Build the desk-mode strategy for this configuration
    pub(crate) fn mode_policy(&self) -> Box<dyn DeskModePolicy> {
        if self.multi_desk {
            Box::new(MultiDeskPolicy {
                max_desks_per_display: self.max_desks_per_display,
            })
        } else {
            Box::new(SingleDeskPolicy)
        }
    }
}

/// Desk-mode strategy, chosen once at session construction
///
/// Replaces per-call single/multi-desk branching: every mode-dependent
/// decision goes through this trait.
pub trait DeskModePolicy: std::fmt::Debug {
    /// Whether more than one desk may exist per display
    fn multi_desk_enabled(&self) -> bool;

    /// Whether a new desk may be created on a display already holding
    /// `existing` desks
    fn can_create_desk(&self, display: DisplayId, existing: usize) -> bool;

    /// Whether an active desk that loses its last visible task should be
    /// deactivated (exit the desktop) or stay active
    fn deactivate_when_emptied(&self) -> bool;
}

/// Legacy single-desk behavior: one desk per display, desktop exits when
/// it empties
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleDeskPolicy;

impl DeskModePolicy for SingleDeskPolicy {
    fn multi_desk_enabled(&self) -> bool {
        false
    }

    fn can_create_desk(&self, _display: DisplayId, existing: usize) -> bool {
        existing == 0
    }

    fn deactivate_when_emptied(&self) -> bool {
        true
    }
}

/// Multi-desk behavior: up to a per-display cap, desks stay active when
/// emptied
#[derive(Clone, Copy, Debug)]
pub struct MultiDeskPolicy {
    max_desks_per_display: usize,
}

impl DeskModePolicy for MultiDeskPolicy {
    fn multi_desk_enabled(&self) -> bool {
        true
    }

    fn can_create_desk(&self, _display: DisplayId, existing: usize) -> bool {
        existing < self.max_desks_per_display
    }

    fn deactivate_when_emptied(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_desk_policy() {
        let policy = SingleDeskPolicy;
        assert!(!policy.multi_desk_enabled());
        assert!(policy.can_create_desk(0, 0));
        assert!(!policy.can_create_desk(0, 1));
        assert!(policy.deactivate_when_emptied());
    }

    #[test]
    fn test_multi_desk_policy_respects_cap() {
        let config = DeskConfig {
            max_desks_per_display: 2,
            ..Default::default()
        };
        let policy = config.mode_policy();
        assert!(policy.multi_desk_enabled());
        assert!(policy.can_create_desk(0, 1));
        assert!(!policy.can_create_desk(0, 2));
        assert!(!policy.deactivate_when_emptied());
    }
}
