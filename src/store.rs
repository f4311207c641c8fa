use crate::error::SessionResult;
use crate::model::{FaceEncoding, UserId};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence for enrolled face encodings, keyed by `(user, person name)`.
///
/// A record exists only while it holds at least one encoding; `save` rejects
/// empty sets so enrollment failure can never leave an empty record behind.
/// Saves are wholesale overwrites, never incremental merges.
#[async_trait]
pub trait EncodingStore: Send + Sync + 'static {
    /// Loads the encodings saved for a name; empty when the name is unknown.
    async fn load(&self, user: &UserId, name: &str) -> SessionResult<Vec<FaceEncoding>>;

    /// Replaces the record for a name wholesale. `encodings` must be
    /// non-empty.
    async fn save(
        &self,
        user: &UserId,
        name: &str,
        encodings: Vec<FaceEncoding>,
    ) -> SessionResult<()>;

    /// Names with at least one saved encoding, sorted.
    async fn list_names(&self, user: &UserId) -> SessionResult<Vec<String>>;

    /// Removes the record for a name. `Ok(false)` when it was absent.
    async fn delete(&self, user: &UserId, name: &str) -> SessionResult<bool>;
}

#[async_trait]
impl<S> EncodingStore for Arc<S>
where
    S: EncodingStore + ?Sized,
{
    async fn load(&self, user: &UserId, name: &str) -> SessionResult<Vec<FaceEncoding>> {
        (**self).load(user, name).await
    }

    async fn save(
        &self,
        user: &UserId,
        name: &str,
        encodings: Vec<FaceEncoding>,
    ) -> SessionResult<()> {
        (**self).save(user, name, encodings).await
    }

    async fn list_names(&self, user: &UserId) -> SessionResult<Vec<String>> {
        (**self).list_names(user).await
    }

    async fn delete(&self, user: &UserId, name: &str) -> SessionResult<bool> {
        (**self).delete(user, name).await
    }
}
