//! Committed-state change events pushed to registered listeners

use crate::desk::{DeskId, DisplayId};
use crate::task::TaskId;

/// Events emitted when repository state commits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeskEvent {
    /// A desk was added to the repository
    DeskAdded { desk: DeskId, display: DisplayId },
    /// A desk was removed from the repository
    DeskRemoved { desk: DeskId, display: DisplayId },
    /// The active desk for a display changed
    ActiveDeskChanged {
        display: DisplayId,
        old: Option<DeskId>,
        new: Option<DeskId>,
    },
    /// The number of visible tasks on a display changed
    VisibleTaskCountChanged { display: DisplayId, count: usize },
    /// A minimize committed
    TaskMinimized { desk: DeskId, task: TaskId },
    /// An unminimize committed
    TaskUnminimized { desk: DeskId, task: TaskId },
}

/// Multi-listener event dispatch
#[derive(Default)]
pub struct EventHub {
    listeners: Vec<Box<dyn FnMut(&DeskEvent)>>,
}

impl EventHub {
    /// Register a listener; all listeners see every event
    pub fn subscribe(&mut self, listener: Box<dyn FnMut(&DeskEvent)>) {
        self.listeners.push(listener);
    }

    /// Push an event to every listener
    pub fn emit(&mut self, event: DeskEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
