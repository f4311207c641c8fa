use crate::error::SessionResult;
use crate::fingerprint::Fingerprint;
use crate::model::{FaceEncoding, UserId};
use crate::oracle::FaceOracle;
use crate::store::EncodingStore;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Photos and names produced by one detection batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchReport {
    /// Distinct names matched anywhere in the batch, sorted.
    pub names: BTreeSet<String>,
    /// Every matched photo exactly once, in arrival order.
    pub photos: Vec<Vec<u8>>,
}

/// Outcome of one detection batch.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchOutcome {
    /// The user has no persisted encodings; matching was not attempted.
    NoKnownFaces,
    /// Known encodings exist but no queued photo matched.
    NoMatches,
    Matches(MatchReport),
}

/// Runs one read-and-compare pass over a snapshot of queued photos.
///
/// Per photo, the first face that matches any known encoding attributes the
/// whole photo to that name (first-match-wins); a photo enters the report at
/// most once, keyed by its own fingerprint. Unreadable or faceless photos
/// contribute nothing and are not errors. The store is never mutated.
pub async fn run_batch<O, S>(
    oracle: &O,
    store: &S,
    user: &UserId,
    tolerance: f64,
    photos: &[Vec<u8>],
) -> SessionResult<BatchOutcome>
where
    O: FaceOracle + ?Sized,
    S: EncodingStore + ?Sized,
{
    let mut known: Vec<(FaceEncoding, String)> = Vec::new();
    for name in store.list_names(user).await? {
        for encoding in store.load(user, &name).await? {
            known.push((encoding, name.clone()));
        }
    }
    if known.is_empty() {
        return Ok(BatchOutcome::NoKnownFaces);
    }
    debug!(
        user = user.as_str(),
        known = known.len(),
        photos = photos.len(),
        "matching batch against known encodings"
    );

    let mut report = MatchReport::default();
    let mut reported: HashSet<Fingerprint> = HashSet::new();
    for photo in photos {
        let faces = match oracle.extract(photo).await {
            Ok(faces) => faces,
            Err(err) => {
                warn!(user = user.as_str(), %err, "skipping unreadable photo in detection batch");
                continue;
            }
        };
        if faces.is_empty() {
            continue;
        }

        let mut matched: Option<&str> = None;
        'faces: for face in &faces {
            for (encoding, name) in &known {
                if oracle.is_match(encoding, face, tolerance) {
                    matched = Some(name);
                    break 'faces;
                }
            }
        }
        let Some(name) = matched else { continue };
        report.names.insert(name.to_owned());
        if reported.insert(Fingerprint::of(photo)) {
            report.photos.push(photo.clone());
        }
    }

    if report.photos.is_empty() {
        Ok(BatchOutcome::NoMatches)
    } else {
        Ok(BatchOutcome::Matches(report))
    }
}
