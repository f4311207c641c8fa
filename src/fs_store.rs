use crate::error::{invalid_input, io_error, serde_error, SessionResult};
use crate::model::{FaceEncoding, UserId};
use crate::store::EncodingStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::debug;

const RECORD_EXT: &str = "json";

/// On-disk payload for one `(user, name)` record.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    encodings: Vec<FaceEncoding>,
    #[serde(with = "time::serde::rfc3339")]
    saved_at: OffsetDateTime,
}

/// File-backed encoding store: one JSON file per `(user, name)` under
/// `root/<user>/<name>.json`.
///
/// User ids and person names are hex-encoded in path components, so
/// arbitrary transport-supplied strings can never escape the root directory.
pub struct FsEncodingStore {
    root: PathBuf,
}

impl FsEncodingStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory holding all records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user: &UserId) -> PathBuf {
        self.root.join(hex::encode(user.as_str()))
    }

    fn record_path(&self, user: &UserId, name: &str) -> PathBuf {
        self.user_dir(user)
            .join(format!("{}.{RECORD_EXT}", hex::encode(name)))
    }

    fn name_from_stem(stem: &str) -> Option<String> {
        let raw = hex::decode(stem).ok()?;
        String::from_utf8(raw).ok()
    }
}

#[async_trait]
impl EncodingStore for FsEncodingStore {
    async fn load(&self, user: &UserId, name: &str) -> SessionResult<Vec<FaceEncoding>> {
        let path = self.record_path(user, name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(err)),
        };
        let record: StoredRecord = serde_json::from_slice(&bytes).map_err(serde_error)?;
        Ok(record.encodings)
    }

    async fn save(
        &self,
        user: &UserId,
        name: &str,
        encodings: Vec<FaceEncoding>,
    ) -> SessionResult<()> {
        if encodings.is_empty() {
            return Err(invalid_input("refusing to save an empty encoding set"));
        }
        let dir = self.user_dir(user);
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;

        let record = StoredRecord {
            encodings,
            saved_at: OffsetDateTime::now_utc(),
        };
        let bytes = serde_json::to_vec(&record).map_err(serde_error)?;
        let path = self.record_path(user, name);
        tokio::fs::write(&path, bytes).await.map_err(io_error)?;
        debug!(user = user.as_str(), person = name, path = %path.display(), "encodings persisted");
        Ok(())
    }

    async fn list_names(&self, user: &UserId) -> SessionResult<Vec<String>> {
        let dir = self.user_dir(user);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(err)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Some(name) = Self::name_from_stem(stem) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, user: &UserId, name: &str) -> SessionResult<bool> {
        match tokio::fs::remove_file(self.record_path(user, name)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_error(err)),
        }
    }
}
