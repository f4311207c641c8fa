use crate::error::SessionResult;
use crate::model::UserId;
use async_trait::async_trait;
use std::sync::Arc;

/// Outgoing half of the messaging transport.
///
/// The coordinator never assumes a wire format; it only asks for text, a
/// grouped set of images, or text with quick-reply choices.
#[async_trait]
pub trait ChatOutbound: Send + Sync + 'static {
    /// Sends a plain text reply.
    async fn send_text(&self, user: &UserId, text: &str) -> SessionResult<()>;

    /// Sends photos as a single grouped message.
    async fn send_media_group(&self, user: &UserId, photos: Vec<Vec<u8>>) -> SessionResult<()>;

    /// Sends text accompanied by quick-reply choices (delete-target
    /// selection).
    async fn send_choices(&self, user: &UserId, text: &str, choices: &[String])
        -> SessionResult<()>;
}

#[async_trait]
impl<T> ChatOutbound for Arc<T>
where
    T: ChatOutbound + ?Sized,
{
    async fn send_text(&self, user: &UserId, text: &str) -> SessionResult<()> {
        (**self).send_text(user, text).await
    }

    async fn send_media_group(&self, user: &UserId, photos: Vec<Vec<u8>>) -> SessionResult<()> {
        (**self).send_media_group(user, photos).await
    }

    async fn send_choices(
        &self,
        user: &UserId,
        text: &str,
        choices: &[String],
    ) -> SessionResult<()> {
        (**self).send_choices(user, text, choices).await
    }
}
