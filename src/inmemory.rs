use crate::error::{invalid_input, SessionResult};
use crate::model::{FaceEncoding, UserId};
use crate::store::EncodingStore;
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory encoding store backed by a concurrent hash map.
///
/// Suitable for tests and single-process deployments that can afford to
/// re-enroll after a restart.
#[derive(Default)]
pub struct InMemoryEncodingStore {
    records: DashMap<(UserId, String), Vec<FaceEncoding>>,
}

impl InMemoryEncodingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EncodingStore for InMemoryEncodingStore {
    async fn load(&self, user: &UserId, name: &str) -> SessionResult<Vec<FaceEncoding>> {
        Ok(self
            .records
            .get(&(user.clone(), name.to_owned()))
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
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
        self.records
            .insert((user.clone(), name.to_owned()), encodings);
        Ok(())
    }

    async fn list_names(&self, user: &UserId) -> SessionResult<Vec<String>> {
        let mut names: Vec<String> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == *user)
            .map(|entry| entry.key().1.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, user: &UserId, name: &str) -> SessionResult<bool> {
        Ok(self
            .records
            .remove(&(user.clone(), name.to_owned()))
            .is_some())
    }
}
