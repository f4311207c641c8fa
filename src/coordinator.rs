use crate::config::CoordinatorConfig;
use crate::model::{Command, InboundEvent, SessionMode, UserId};
use crate::oracle::FaceOracle;
use crate::outbound::ChatOutbound;
use crate::registry::SessionRegistry;
use crate::store::EncodingStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Keyword that completes photo collection during enrollment.
pub const DONE_KEYWORD: &str = "done";

const HELP_TEXT: &str = "Hello! You can:\n\
    \u{2022} Use /add to teach me a person's face\n\
    \u{2022} Use /list to see known faces\n\
    \u{2022} Use /delete to remove a trained face\n\n\
    Or simply send me photos. After a short pause I'll look for known faces in them.";

/// Routes one user's inbound events through their session under mutual
/// exclusion and drives the enrollment, deletion, and detection flows.
///
/// Cloning is cheap; clones share the registry and collaborators, which is
/// how the debounce timer task reaches back into the coordinator.
pub struct Coordinator<O, S, T> {
    pub(crate) inner: Arc<Inner<O, S, T>>,
}

pub(crate) struct Inner<O, S, T> {
    pub(crate) registry: SessionRegistry,
    pub(crate) oracle: O,
    pub(crate) store: S,
    pub(crate) outbound: T,
    pub(crate) config: CoordinatorConfig,
}

impl<O, S, T> Clone for Coordinator<O, S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O, S, T> Coordinator<O, S, T>
where
    O: FaceOracle,
    S: EncodingStore,
    T: ChatOutbound,
{
    pub fn new(oracle: O, store: S, outbound: T, config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: SessionRegistry::new(),
                oracle,
                store,
                outbound,
                config,
            }),
        }
    }

    /// Live-session registry, exposed for observability.
    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// The configuration this coordinator was built with.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Entry point: dispatches one inbound event for one user.
    ///
    /// Never returns an error; every failure is either reported to the user
    /// or logged, and a failure for one user cannot affect another.
    pub async fn handle_event(&self, user: &UserId, event: InboundEvent) {
        match event {
            InboundEvent::Command(command) => self.handle_command(user, command).await,
            InboundEvent::Text(text) => self.handle_text(user, text).await,
            InboundEvent::Photo(bytes) => self.handle_photo(user, bytes).await,
        }
    }

    async fn handle_command(&self, user: &UserId, command: Command) {
        debug!(user = user.as_str(), ?command, "handling command");
        match command {
            Command::Start => self.reply(user, HELP_TEXT).await,
            Command::List => self.list_known_faces(user).await,
            Command::Add => self.begin_enrollment(user).await,
            Command::Delete => self.begin_deletion(user).await,
            Command::Cancel => self.cancel(user).await,
        }
    }

    async fn list_known_faces(&self, user: &UserId) {
        match self.inner.store.list_names(user).await {
            Ok(names) if names.is_empty() => {
                self.reply(user, "You have no trained faces yet.").await;
            }
            Ok(names) => {
                let mut text = String::from("Known faces:");
                for name in &names {
                    text.push_str("\n\u{2022} ");
                    text.push_str(name);
                }
                self.reply(user, &text).await;
            }
            Err(err) => {
                self.reply(user, &format!("Could not list faces: {err}"))
                    .await;
            }
        }
    }

    async fn begin_enrollment(&self, user: &UserId) {
        let mut session = self.inner.registry.acquire(user).await;
        if let SessionMode::DetectionQueue { photos, .. } = &session.mode {
            debug!(
                user = user.as_str(),
                dropped = photos.len(),
                "enrollment discards pending detection queue"
            );
        }
        session.enter(SessionMode::EnrollingName);
        drop(session);
        self.reply(user, "Please send the name of the person to add.")
            .await;
    }

    async fn begin_deletion(&self, user: &UserId) {
        let names = match self.inner.store.list_names(user).await {
            Ok(names) => names,
            Err(err) => {
                self.reply(user, &format!("Could not list faces: {err}"))
                    .await;
                return;
            }
        };
        if names.is_empty() {
            self.reply(user, "You have no trained faces yet.").await;
            return;
        }

        let mut session = self.inner.registry.acquire(user).await;
        session.enter(SessionMode::DeleteChoicePending {
            names: names.clone(),
        });
        drop(session);
        self.send_choices(user, "Select a face to delete:", &names)
            .await;
    }

    async fn cancel(&self, user: &UserId) {
        let mut session = self.inner.registry.acquire(user).await;
        session.cancel_timer();
        self.inner.registry.close(&mut session);
        drop(session);
        self.reply(user, "Operation cancelled.").await;
    }

    async fn handle_text(&self, user: &UserId, text: String) {
        let mut session = self.inner.registry.acquire(user).await;
        match &mut session.mode {
            SessionMode::EnrollingName => {
                let name = text.trim();
                if name.is_empty() {
                    drop(session);
                    self.reply(user, "Name cannot be empty.").await;
                    return;
                }
                let prompt = format!(
                    "Got it! Send at least {} pictures of {name}. Type '{DONE_KEYWORD}' when finished.",
                    self.inner.config.min_photos
                );
                session.enter(SessionMode::EnrollingPhotos {
                    name: name.to_owned(),
                    photos: Vec::new(),
                });
                drop(session);
                self.reply(user, &prompt).await;
            }
            SessionMode::EnrollingPhotos { name, photos } => {
                if !text.trim().eq_ignore_ascii_case(DONE_KEYWORD) {
                    drop(session);
                    self.reply(user, &format!("Please send a photo or type '{DONE_KEYWORD}'."))
                        .await;
                    return;
                }
                let min = self.inner.config.min_photos;
                let count = photos.len();
                if count < min {
                    // The collected photos are kept; the user may add more.
                    drop(session);
                    self.reply(
                        user,
                        &format!("You've sent only {count}. Need {} more.", min - count),
                    )
                    .await;
                    return;
                }
                let name = std::mem::take(name);
                let photos = std::mem::take(photos);
                self.inner.registry.close(&mut session);
                drop(session);
                self.finalize_enrollment(user, name, photos).await;
            }
            SessionMode::DeleteChoicePending { names } => {
                let choice = text.trim().to_owned();
                let known = names.contains(&choice);
                self.inner.registry.close(&mut session);
                drop(session);
                if known {
                    self.delete_known_face(user, &choice).await;
                } else {
                    self.reply(user, &format!("'{choice}' does not exist."))
                        .await;
                }
            }
            SessionMode::Idle => {
                // Stray text never needs session state; drop the slot that
                // `acquire` just created.
                self.inner.registry.close(&mut session);
                drop(session);
                debug!(user = user.as_str(), "ignoring free text outside a flow");
            }
            SessionMode::DetectionQueue { .. } => {
                debug!(
                    user = user.as_str(),
                    "ignoring free text while a detection queue is pending"
                );
            }
        }
    }

    async fn handle_photo(&self, user: &UserId, bytes: Vec<u8>) {
        let mut session = self.inner.registry.acquire(user).await;
        match &mut session.mode {
            SessionMode::EnrollingPhotos { photos, .. } => {
                photos.push(bytes);
                let count = photos.len();
                drop(session);
                self.reply(
                    user,
                    &format!("Photo received ({count}). Send more or type '{DONE_KEYWORD}'."),
                )
                .await;
            }
            SessionMode::EnrollingName => {
                drop(session);
                self.reply(user, "Please send the name of the person to add.")
                    .await;
            }
            SessionMode::DeleteChoicePending { names } => {
                let names = names.clone();
                drop(session);
                self.send_choices(user, "Select a face to delete:", &names)
                    .await;
            }
            SessionMode::Idle | SessionMode::DetectionQueue { .. } => {
                self.queue_detection_photo(user, session, bytes).await;
            }
        }
    }

    /// Extracts and persists encodings for a completed enrollment. Runs
    /// outside the session lock; the session is already gone.
    async fn finalize_enrollment(&self, user: &UserId, name: String, photos: Vec<Vec<u8>>) {
        let mut encodings = Vec::new();
        for (idx, photo) in photos.iter().enumerate() {
            match self.inner.oracle.extract(photo).await {
                Ok(faces) => match faces.into_iter().next() {
                    Some(face) => encodings.push(face),
                    None => {
                        debug!(
                            user = user.as_str(),
                            photo = idx,
                            "no face found in enrollment photo"
                        );
                    }
                },
                Err(err) => {
                    warn!(
                        user = user.as_str(),
                        photo = idx,
                        %err,
                        "skipping unreadable enrollment photo"
                    );
                }
            }
        }

        if encodings.is_empty() {
            self.reply(user, "No faces detected. Please try again.")
                .await;
            return;
        }

        let saved = encodings.len();
        match self.inner.store.save(user, &name, encodings).await {
            Ok(()) => {
                info!(
                    user = user.as_str(),
                    name = name.as_str(),
                    saved,
                    "enrollment persisted"
                );
                self.reply(user, &format!("{saved} faces saved for '{name}'!"))
                    .await;
            }
            Err(err) => {
                self.reply(user, &format!("Failed to save '{name}': {err}"))
                    .await;
            }
        }
    }

    async fn delete_known_face(&self, user: &UserId, name: &str) {
        match self.inner.store.delete(user, name).await {
            Ok(true) => {
                info!(user = user.as_str(), name, "enrolled face deleted");
                self.reply(user, &format!("'{name}' deleted successfully."))
                    .await;
            }
            Ok(false) => {
                self.reply(user, &format!("'{name}' does not exist."))
                    .await;
            }
            Err(err) => {
                self.reply(user, &format!("Failed to delete '{name}': {err}"))
                    .await;
            }
        }
    }

    pub(crate) async fn reply(&self, user: &UserId, text: &str) {
        if let Err(err) = self.inner.outbound.send_text(user, text).await {
            warn!(user = user.as_str(), %err, "failed to deliver reply");
        }
    }

    pub(crate) async fn send_media_group(&self, user: &UserId, photos: Vec<Vec<u8>>) {
        if let Err(err) = self.inner.outbound.send_media_group(user, photos).await {
            warn!(user = user.as_str(), %err, "failed to deliver media group");
        }
    }

    async fn send_choices(&self, user: &UserId, text: &str, choices: &[String]) {
        if let Err(err) = self.inner.outbound.send_choices(user, text, choices).await {
            warn!(user = user.as_str(), %err, "failed to deliver choices");
        }
    }
}
