#![allow(dead_code)]

//! Shared fakes for the integration suites.
//!
//! Test photos are plain byte strings of the form `"faces|nonce"`: the part
//! before `|` lists the face labels in the photo (comma separated, `ERR`
//! forces an extraction failure, empty means no faces) and the nonce makes
//! otherwise-identical photos byte-distinct.

use async_trait::async_trait;
use facebot_session::{
    ChatOutbound, Command, Coordinator, CoordinatorConfig, EncodingStore, FaceEncoding,
    FaceOracle, InMemoryEncodingStore, InboundEvent, SessionError, SessionResult, UserId,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const ENCODING_DIMS: usize = 16;

/// Deterministic encoding for a face label.
pub fn encoding_for(label: &str) -> FaceEncoding {
    let mut dims = vec![0.0; ENCODING_DIMS];
    for (slot, byte) in dims.iter_mut().zip(label.bytes()) {
        *slot = byte as f64;
    }
    FaceEncoding(dims)
}

/// Builds photo bytes carrying the given face labels.
pub fn photo(faces: &str, nonce: &str) -> Vec<u8> {
    format!("{faces}|{nonce}").into_bytes()
}

pub fn uid(id: &str) -> UserId {
    UserId(id.to_owned())
}

/// Oracle that reads face labels straight out of the test photo bytes and
/// matches encodings by Euclidean distance.
pub struct ScriptedOracle;

#[async_trait]
impl FaceOracle for ScriptedOracle {
    async fn extract(&self, image: &[u8]) -> SessionResult<Vec<FaceEncoding>> {
        let text = std::str::from_utf8(image)
            .map_err(|_| SessionError::Extraction("not a test photo".into()))?;
        let faces = text.split('|').next().unwrap_or_default();
        if faces == "ERR" {
            return Err(SessionError::Extraction("scripted failure".into()));
        }
        Ok(faces
            .split(',')
            .filter(|label| !label.is_empty())
            .map(encoding_for)
            .collect())
    }

    fn is_match(&self, known: &FaceEncoding, candidate: &FaceEncoding, tolerance: f64) -> bool {
        if known.0.len() != candidate.0.len() {
            return false;
        }
        let distance: f64 = known
            .0
            .iter()
            .zip(&candidate.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        distance <= tolerance
    }
}

/// Store wrapper that injects I/O failures per operation.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryEncodingStore,
    fail_save: AtomicBool,
    fail_delete: AtomicBool,
    fail_list: AtomicBool,
}

impl FlakyStore {
    pub fn fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    fn broken(op: &str) -> SessionError {
        SessionError::Store(format!("injected {op} failure"))
    }
}

#[async_trait]
impl EncodingStore for FlakyStore {
    async fn load(&self, user: &UserId, name: &str) -> SessionResult<Vec<FaceEncoding>> {
        self.inner.load(user, name).await
    }

    async fn save(
        &self,
        user: &UserId,
        name: &str,
        encodings: Vec<FaceEncoding>,
    ) -> SessionResult<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Self::broken("save"));
        }
        self.inner.save(user, name, encodings).await
    }

    async fn list_names(&self, user: &UserId) -> SessionResult<Vec<String>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::broken("list"));
        }
        self.inner.list_names(user).await
    }

    async fn delete(&self, user: &UserId, name: &str) -> SessionResult<bool> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::broken("delete"));
        }
        self.inner.delete(user, name).await
    }
}

/// Every message the coordinator sent, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    Text(String),
    MediaGroup(Vec<Vec<u8>>),
    Choices { text: String, options: Vec<String> },
}

#[derive(Default)]
pub struct RecordingOutbound {
    messages: Mutex<Vec<Outgoing>>,
}

impl RecordingOutbound {
    pub fn sent(&self) -> Vec<Outgoing> {
        self.messages.lock().clone()
    }

    /// Returns and clears everything recorded so far.
    pub fn drain(&self) -> Vec<Outgoing> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|msg| match msg {
                Outgoing::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatOutbound for RecordingOutbound {
    async fn send_text(&self, _user: &UserId, text: &str) -> SessionResult<()> {
        self.messages.lock().push(Outgoing::Text(text.to_owned()));
        Ok(())
    }

    async fn send_media_group(&self, _user: &UserId, photos: Vec<Vec<u8>>) -> SessionResult<()> {
        self.messages.lock().push(Outgoing::MediaGroup(photos));
        Ok(())
    }

    async fn send_choices(
        &self,
        _user: &UserId,
        text: &str,
        choices: &[String],
    ) -> SessionResult<()> {
        self.messages.lock().push(Outgoing::Choices {
            text: text.to_owned(),
            options: choices.to_vec(),
        });
        Ok(())
    }
}

pub type TestCoordinator =
    Coordinator<Arc<ScriptedOracle>, Arc<InMemoryEncodingStore>, Arc<RecordingOutbound>>;

pub struct Harness {
    pub coordinator: TestCoordinator,
    pub store: Arc<InMemoryEncodingStore>,
    pub outbound: Arc<RecordingOutbound>,
}

pub fn harness_with(config: CoordinatorConfig) -> Harness {
    let store = Arc::new(InMemoryEncodingStore::new());
    let outbound = Arc::new(RecordingOutbound::default());
    let coordinator = Coordinator::new(
        Arc::new(ScriptedOracle),
        Arc::clone(&store),
        Arc::clone(&outbound),
        config,
    );
    Harness {
        coordinator,
        store,
        outbound,
    }
}

pub fn harness() -> Harness {
    harness_with(CoordinatorConfig::default())
}

pub type FlakyCoordinator =
    Coordinator<Arc<ScriptedOracle>, Arc<FlakyStore>, Arc<RecordingOutbound>>;

pub struct FlakyHarness {
    pub coordinator: FlakyCoordinator,
    pub store: Arc<FlakyStore>,
    pub outbound: Arc<RecordingOutbound>,
}

/// Harness whose store can be told to fail per operation.
pub fn flaky_harness() -> FlakyHarness {
    let store = Arc::new(FlakyStore::default());
    let outbound = Arc::new(RecordingOutbound::default());
    let coordinator = Coordinator::new(
        Arc::new(ScriptedOracle),
        Arc::clone(&store),
        Arc::clone(&outbound),
        CoordinatorConfig::default(),
    );
    FlakyHarness {
        coordinator,
        store,
        outbound,
    }
}

/// Config with a short quiet period so debounce tests run quickly.
pub fn fast_config(quiet_period_ms: u64) -> CoordinatorConfig {
    CoordinatorConfig {
        quiet_period_ms,
        ..CoordinatorConfig::default()
    }
}

/// Drives a complete enrollment through the conversational flow.
pub async fn enroll(h: &Harness, user: &UserId, name: &str, photos: &[Vec<u8>]) {
    h.coordinator
        .handle_event(user, InboundEvent::Command(Command::Add))
        .await;
    h.coordinator
        .handle_event(user, InboundEvent::Text(name.to_owned()))
        .await;
    for bytes in photos {
        h.coordinator
            .handle_event(user, InboundEvent::Photo(bytes.clone()))
            .await;
    }
    h.coordinator
        .handle_event(user, InboundEvent::Text("done".to_owned()))
        .await;
}
