//! Debounced batch collection for ambient detection photos.
//!
//! Each new photo restarts the quiet-period countdown; the batch fires once
//! the user goes silent. Timer scheduling, cancellation, and the fire-time
//! snapshot all happen under the session lock, while oracle and store calls
//! run on a snapshot outside it.

use crate::coordinator::Coordinator;
use crate::model::{DebounceTimer, QueueOutcome, Session, SessionId, UserId};
use crate::oracle::FaceOracle;
use crate::outbound::ChatOutbound;
use crate::pipeline::{self, BatchOutcome};
use crate::store::EncodingStore;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

impl<O, S, T> Coordinator<O, S, T>
where
    O: FaceOracle,
    S: EncodingStore,
    T: ChatOutbound,
{
    /// Queues an ambient photo and restarts the quiet-period countdown.
    ///
    /// Duplicate bytes within the burst are dropped with no acknowledgement
    /// and without touching the timer, absorbing retransmissions.
    pub(crate) async fn queue_detection_photo(
        &self,
        user: &UserId,
        mut session: OwnedMutexGuard<Session>,
        bytes: Vec<u8>,
    ) {
        let queued = match session.enqueue_detection_photo(bytes) {
            QueueOutcome::Duplicate => {
                debug!(
                    user = user.as_str(),
                    "dropping duplicate photo from detection queue"
                );
                return;
            }
            QueueOutcome::Queued(len) => len,
        };

        let session_id = session.id.clone();
        let epoch = session.next_timer_epoch();
        let quiet = self.inner.config.quiet_period();
        let handle = {
            let coordinator = self.clone();
            let user = user.clone();
            let session_id = session_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(quiet).await;
                coordinator.fire_batch(&user, session_id, epoch).await;
            })
        };
        session.arm_timer(DebounceTimer::new(handle, epoch));
        drop(session);

        self.reply(user, &format!("Photo queued ({queued}).")).await;
    }

    /// Timer expiry path: snapshot the queue, tear the session down, and run
    /// the matching pipeline on the snapshot.
    pub(crate) async fn fire_batch(&self, user: &UserId, session_id: SessionId, epoch: u64) {
        let Some(mut session) = self.inner.registry.acquire_existing(user).await else {
            return;
        };
        // No await between winning the lock and taking the snapshot, so a
        // cancel can only land before this point or never.
        let Some(photos) = session.take_detection_batch(&session_id, epoch) else {
            debug!(
                user = user.as_str(),
                "stale debounce timer, batch was superseded or discarded"
            );
            return;
        };
        self.inner.registry.close(&mut session);
        drop(session);

        info!(
            user = user.as_str(),
            photos = photos.len(),
            "detection batch fired"
        );
        let outcome = pipeline::run_batch(
            &self.inner.oracle,
            &self.inner.store,
            user,
            self.inner.config.match_tolerance,
            &photos,
        )
        .await;
        match outcome {
            Ok(BatchOutcome::NoKnownFaces) => {
                self.reply(user, "No trained faces yet. Use /add first.")
                    .await;
            }
            Ok(BatchOutcome::NoMatches) => {
                self.reply(user, "No matching faces found.").await;
            }
            Ok(BatchOutcome::Matches(report)) => {
                let names = report
                    .names
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.reply(user, &format!("Matched faces: {names}")).await;
                self.send_media_group(user, report.photos).await;
            }
            Err(err) => {
                warn!(user = user.as_str(), %err, "detection batch failed");
                self.reply(user, &format!("Face search failed: {err}")).await;
            }
        }
    }
}
