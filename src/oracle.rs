use crate::error::SessionResult;
use crate::model::FaceEncoding;
use async_trait::async_trait;
use std::sync::Arc;

/// Face detection and comparison collaborator, treated as a black box.
#[async_trait]
pub trait FaceOracle: Send + Sync + 'static {
    /// Returns every face encoding found in the image, possibly none.
    ///
    /// May fail transiently per call; callers skip the offending photo
    /// rather than aborting the surrounding batch.
    async fn extract(&self, image: &[u8]) -> SessionResult<Vec<FaceEncoding>>;

    /// Whether two encodings belong to the same person at the given
    /// tolerance (lower is stricter).
    fn is_match(&self, known: &FaceEncoding, candidate: &FaceEncoding, tolerance: f64) -> bool;
}

#[async_trait]
impl<O> FaceOracle for Arc<O>
where
    O: FaceOracle + ?Sized,
{
    async fn extract(&self, image: &[u8]) -> SessionResult<Vec<FaceEncoding>> {
        (**self).extract(image).await
    }

    fn is_match(&self, known: &FaceEncoding, candidate: &FaceEncoding, tolerance: f64) -> bool {
        (**self).is_match(known, candidate, tolerance)
    }
}
