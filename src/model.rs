use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Unique identifier for one session instance.
///
/// A fresh id is minted whenever a session is created, so a debounce timer
/// scheduled against a discarded session can never fire against its
/// replacement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generates a fresh session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the raw UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque per-user key handed over by the messaging transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Borrows the underlying key as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-size numeric encoding of one detected face, opaque to this crate
/// and produced by the face oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding(pub Vec<f64>);

/// Typed events delivered by the messaging transport for one user.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    Command(Command),
    Text(String),
    Photo(Vec<u8>),
}

/// Explicit commands a user can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Add,
    List,
    Delete,
    Cancel,
}

/// Cancellable delayed task owned by a detection-queue session.
///
/// `cancel` aborts the sleeping task; dropping without cancelling detaches
/// it instead, which is what the firing task itself relies on.
#[derive(Debug)]
pub struct DebounceTimer {
    handle: JoinHandle<()>,
    epoch: u64,
}

impl DebounceTimer {
    pub(crate) fn new(handle: JoinHandle<()>, epoch: u64) -> Self {
        Self { handle, epoch }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn cancel(self) {
        self.handle.abort();
    }
}

/// Conversational mode of one session. Exactly one is active per user;
/// entering a mode discards the previous mode's payload.
#[derive(Debug, Default)]
pub enum SessionMode {
    #[default]
    Idle,
    /// `/add` issued, waiting for the person's name.
    EnrollingName,
    /// Name captured, collecting enrollment photos in arrival order.
    EnrollingPhotos { name: String, photos: Vec<Vec<u8>> },
    /// `/delete` issued; `names` is the choice list that was offered.
    DeleteChoicePending { names: Vec<String> },
    /// Ambient photos queued for a debounced matching pass.
    DetectionQueue {
        photos: Vec<Vec<u8>>,
        seen: HashSet<Fingerprint>,
        timer: Option<DebounceTimer>,
        epoch: u64,
    },
}

impl SessionMode {
    /// Short label for tracing.
    pub fn label(&self) -> &'static str {
        match self {
            SessionMode::Idle => "idle",
            SessionMode::EnrollingName => "enrolling_name",
            SessionMode::EnrollingPhotos { .. } => "enrolling_photos",
            SessionMode::DeleteChoicePending { .. } => "delete_choice_pending",
            SessionMode::DetectionQueue { .. } => "detection_queue",
        }
    }
}

/// Result of offering a photo to the detection queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Accepted; the payload is the new queue length.
    Queued(usize),
    /// Same bytes were already queued in this burst; dropped silently.
    Duplicate,
}

/// Ephemeral per-user state, owned by the registry and mutated only while
/// its per-user lock is held. Nothing here survives a process restart.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub user: UserId,
    pub mode: SessionMode,
    /// Set when the slot has been removed from the registry; a guard that
    /// observes it must retry the lookup instead of mutating a dead session.
    pub(crate) closed: bool,
}

impl Session {
    pub(crate) fn new(user: UserId) -> Self {
        Self {
            id: SessionId::new(),
            user,
            mode: SessionMode::Idle,
            closed: false,
        }
    }

    /// Switches mode, cancelling any pending detection timer and discarding
    /// the previous mode's payload.
    pub fn enter(&mut self, mode: SessionMode) {
        self.cancel_timer();
        self.mode = mode;
    }

    /// Aborts the pending detection timer, if any.
    pub(crate) fn cancel_timer(&mut self) {
        if let SessionMode::DetectionQueue { timer, .. } = &mut self.mode {
            if let Some(pending) = timer.take() {
                pending.cancel();
            }
        }
    }

    /// Offers a photo to the detection queue, entering `DetectionQueue` if
    /// the session was in another mode. Duplicate bytes within the burst are
    /// rejected by fingerprint.
    pub fn enqueue_detection_photo(&mut self, bytes: Vec<u8>) -> QueueOutcome {
        let fp = Fingerprint::of(&bytes);
        match &mut self.mode {
            SessionMode::DetectionQueue { photos, seen, .. } => {
                if !seen.insert(fp) {
                    return QueueOutcome::Duplicate;
                }
                photos.push(bytes);
                QueueOutcome::Queued(photos.len())
            }
            _ => {
                self.enter(SessionMode::DetectionQueue {
                    photos: vec![bytes],
                    seen: HashSet::from([fp]),
                    timer: None,
                    epoch: 0,
                });
                QueueOutcome::Queued(1)
            }
        }
    }

    /// Cancels the pending detection timer and reserves the epoch the next
    /// timer must present when it fires. Each call invalidates every timer
    /// scheduled before it.
    pub(crate) fn next_timer_epoch(&mut self) -> u64 {
        let SessionMode::DetectionQueue { timer, epoch, .. } = &mut self.mode else {
            return 0;
        };
        if let Some(pending) = timer.take() {
            pending.cancel();
        }
        *epoch += 1;
        *epoch
    }

    /// Stores a freshly spawned timer. The timer is discarded unless its
    /// epoch is still the current one.
    pub(crate) fn arm_timer(&mut self, new_timer: DebounceTimer) {
        if let SessionMode::DetectionQueue { timer, epoch, .. } = &mut self.mode {
            if *epoch == new_timer.epoch() {
                *timer = Some(new_timer);
                return;
            }
        }
        new_timer.cancel();
    }

    /// Hands the queued photos to a firing timer and resets the mode.
    ///
    /// Returns `None` when the timer is stale: the session instance changed,
    /// the mode moved on, or a newer timer superseded this epoch. The timer
    /// entry is dropped without aborting because the firing task is dropping
    /// its own handle.
    pub(crate) fn take_detection_batch(
        &mut self,
        session_id: &SessionId,
        fired_epoch: u64,
    ) -> Option<Vec<Vec<u8>>> {
        if self.id != *session_id {
            return None;
        }
        match &mut self.mode {
            SessionMode::DetectionQueue {
                photos,
                timer,
                epoch,
                ..
            } if *epoch == fired_epoch => {
                let _detached = timer.take();
                let batch = std::mem::take(photos);
                self.mode = SessionMode::Idle;
                Some(batch)
            }
            _ => None,
        }
    }
}
