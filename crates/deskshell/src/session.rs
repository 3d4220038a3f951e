//! Per-user session registry
//!
//! Keyed store of [`DeskOrganizer`] sessions with create-on-demand and
//! explicit teardown. Also owns the "get-or-create default desk" flow:
//! desk creation is an asynchronous round trip through the embedder's
//! backend, so callers get a single-resolution future and concurrent
//! requests for the same (display, user) pair are deduplicated through
//! an in-flight map instead of racing to create duplicates.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use futures::channel::oneshot;
use tracing::{debug, warn};

use crate::config::DeskConfig;
use crate::desk::{DeskId, DisplayId, UserId};
use crate::error::DeskResult;
use crate::organizer::{DeskOrganizer, PreparedTransition};
use crate::persistence::DeskPersistence;

/// Embedder hook that asynchronously creates desks
///
/// `create_desk` is fire-and-forget; the embedder reports completion
/// through [`SessionRegistry::on_desk_created`] on the sequencing
/// context.
pub trait DeskBackend {
    fn create_desk(&mut self, display: DisplayId, user: UserId);
}

/// Registry of per-user desk sessions
pub struct SessionRegistry {
    config: DeskConfig,
    sessions: HashMap<UserId, DeskOrganizer>,
    /// Shared waiters per (display, user) default-desk round trip
    inflight: HashMap<(DisplayId, UserId), Vec<oneshot::Sender<DeskId>>>,
    /// One waiter per explicit desk-creation request, in request order
    explicit: HashMap<(DisplayId, UserId), VecDeque<oneshot::Sender<DeskId>>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .field("inflight", &self.inflight.keys().collect::<Vec<_>>())
            .field("explicit", &self.explicit.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(config: DeskConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
            inflight: HashMap::new(),
            explicit: HashMap::new(),
        }
    }

    /// An existing user's session
    pub fn session(&self, user: UserId) -> Option<&DeskOrganizer> {
        self.sessions.get(&user)
    }

    /// A user's session, created on demand
    pub fn session_mut(&mut self, user: UserId) -> DeskResult<&mut DeskOrganizer> {
        match self.sessions.entry(user) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                debug!(user, "creating desk session");
                Ok(e.insert(DeskOrganizer::new(user, &self.config)?))
            }
        }
    }

    /// Tear down a user's session
    ///
    /// In-flight desk-creation waiters for the user are dropped, which
    /// cancels their futures.
    pub fn remove_user(&mut self, user: UserId) {
        if self.sessions.remove(&user).is_some() {
            debug!(user, "removed desk session");
        }
        self.inflight.retain(|(_, u), _| *u != user);
        self.explicit.retain(|(_, u), _| *u != user);
    }

    /// Active user ids
    pub fn user_ids(&self) -> Vec<UserId> {
        self.sessions.keys().copied().collect()
    }

    /// Resolve the default desk for (display, user), creating one
    /// through the backend when none exists
    ///
    /// The returned future resolves immediately when a desk already
    /// exists. Otherwise the first caller triggers one backend request
    /// and later callers for the same pair join its waiter list.
    pub fn get_or_create_default_desk(
        &mut self,
        display: DisplayId,
        user: UserId,
        backend: &mut dyn DeskBackend,
    ) -> DeskResult<oneshot::Receiver<DeskId>> {
        let session = self.session_mut(user)?;
        let (tx, rx) = oneshot::channel();

        if let Some(desk) = session.repository().default_desk_id(display) {
            let _ = tx.send(desk);
            return Ok(rx);
        }

        // Aliased: a local named `display` inside tracing macros collides
        // with `tracing::field::display`.
        let display_id = display;
        match self.inflight.entry((display, user)) {
            Entry::Occupied(mut e) => {
                debug!(display = display_id, user, "joining in-flight desk creation");
                e.get_mut().push(tx);
            }
            Entry::Vacant(e) => {
                debug!(display = display_id, user, "requesting desk creation");
                e.insert(vec![tx]);
                backend.create_desk(display, user);
            }
        }
        Ok(rx)
    }

    /// Request creation of an additional desk on a display
    ///
    /// Policy-gated: when the session's desk-mode policy refuses another
    /// desk on the display, the request is absorbed and the returned
    /// future is cancelled. Unlike the default-desk flow, every accepted
    /// request issues its own backend round trip.
    pub fn create_desk(
        &mut self,
        display: DisplayId,
        user: UserId,
        backend: &mut dyn DeskBackend,
    ) -> DeskResult<oneshot::Receiver<DeskId>> {
        let session = self.session_mut(user)?;
        let (tx, rx) = oneshot::channel();
        let display_id = display;
        if !session.can_create_desks(display) {
            warn!(display = display_id, user, "desk creation refused by mode policy");
            return Ok(rx);
        }
        debug!(display = display_id, user, "requesting additional desk");
        self.explicit.entry((display, user)).or_default().push_back(tx);
        backend.create_desk(display, user);
        Ok(rx)
    }

    /// Backend completion callback for a desk-creation round trip
    ///
    /// Registers the desk, hands it to the oldest explicit waiter if one
    /// is queued, and resolves default-desk waiters with the display's
    /// default desk.
    pub fn on_desk_created(
        &mut self,
        display: DisplayId,
        user: UserId,
        desk: DeskId,
    ) -> DeskResult<()> {
        let session = self.session_mut(user)?;
        session.register_desk(desk, display);
        let fallback = session.repository().default_desk_id(display).unwrap_or(desk);

        if let Entry::Occupied(mut e) = self.explicit.entry((display, user)) {
            if let Some(tx) = e.get_mut().pop_front() {
                let _ = tx.send(desk);
            }
            if e.get().is_empty() {
                e.remove();
            }
        }
        if let Some(waiters) = self.inflight.remove(&(display, user)) {
            for tx in waiters {
                let _ = tx.send(fallback);
            }
        }
        Ok(())
    }

    /// A display disconnected: re-home or tear down its desks in every
    /// session
    ///
    /// Cross-session work iterates explicitly; sessions share nothing.
    pub fn remove_display(
        &mut self,
        display: DisplayId,
        fallback: Option<DisplayId>,
    ) -> Vec<(UserId, PreparedTransition)> {
        self.inflight.retain(|(d, _), _| *d != display);
        self.explicit.retain(|(d, _), _| *d != display);
        self.sessions
            .iter_mut()
            .map(|(user, session)| (*user, session.remove_display(display, fallback)))
            .filter(|(_, prepared)| !prepared.is_empty())
            .collect()
    }

    /// Persist a user's session, absorbing storage errors
    pub fn save_session(&self, user: UserId, store: &mut dyn DeskPersistence) {
        let Some(session) = self.sessions.get(&user) else {
            return;
        };
        let snapshot = session.export_for_persistence();
        if let Err(err) = store.save(user, &snapshot) {
            warn!(user, %err, "failed to persist desk session");
        }
    }

    /// Restore a user's session from storage, absorbing errors
    pub fn load_session(&mut self, user: UserId, store: &mut dyn DeskPersistence) -> DeskResult<()> {
        let snapshot = match store.load(user) {
            Ok(Some(mut snapshot)) => {
                if snapshot.needs_migration() {
                    snapshot.migrate();
                }
                snapshot
            }
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!(user, %err, "failed to load desk session");
                return Ok(());
            }
        };
        self.session_mut(user)?.import_from_persistence(&snapshot);
        Ok(())
    }
}
