use crate::model::{Session, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Arc<Mutex<Session>>;

/// Process-scoped map of live sessions with one mutual-exclusion slot per
/// user.
///
/// Every handler touching a user's session goes through `acquire`; the tokio
/// mutex is FIFO-fair, so one user's events are served in arrival order
/// while different users proceed in parallel. A session removed via `close`
/// while callers are parked on its mutex is observed through the `closed`
/// marker, and those callers restart against a fresh slot.
#[derive(Default)]
pub struct SessionRegistry {
    slots: DashMap<UserId, Slot>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the user's session, creating an `Idle` one if absent.
    pub async fn acquire(&self, user: &UserId) -> OwnedMutexGuard<Session> {
        loop {
            let slot = self
                .slots
                .entry(user.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(user.clone()))))
                .clone();
            let guard = slot.lock_owned().await;
            if !guard.closed {
                return guard;
            }
            // Slot died while we were parked; look up the replacement.
        }
    }

    /// Locks the user's session only if one is live; never creates.
    pub async fn acquire_existing(&self, user: &UserId) -> Option<OwnedMutexGuard<Session>> {
        loop {
            let slot = self.slots.get(user).map(|entry| entry.value().clone())?;
            let guard = slot.lock_owned().await;
            if !guard.closed {
                return Some(guard);
            }
        }
    }

    /// Marks the session closed and drops its slot from the map.
    ///
    /// The entry is removed only while it still points at this guard's slot,
    /// so a replacement session created by a racing `acquire` is untouched.
    pub fn close(&self, guard: &mut OwnedMutexGuard<Session>) {
        guard.closed = true;
        let slot = OwnedMutexGuard::mutex(guard).clone();
        self.slots
            .remove_if(&guard.user, |_, live| Arc::ptr_eq(live, &slot));
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
