#![forbid(unsafe_code)]

//! Per-user session coordination for a face-enrollment and face-detection
//! chat service.
//!
//! The coordinator serializes each user's events through a registry of
//! per-user sessions, drives the enrollment and deletion conversations,
//! debounces bursty ambient photo streams into a single matching pass, and
//! talks to three collaborators behind traits: the [`FaceOracle`], the
//! [`EncodingStore`], and the [`ChatOutbound`] messaging transport.

mod collector;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod fs_store;
pub mod inmemory;
pub mod model;
pub mod oracle;
pub mod outbound;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, DONE_KEYWORD};
pub use error::{SessionError, SessionResult};
pub use fingerprint::Fingerprint;
pub use fs_store::FsEncodingStore;
pub use inmemory::InMemoryEncodingStore;
pub use model::{
    Command, FaceEncoding, InboundEvent, QueueOutcome, Session, SessionId, SessionMode, UserId,
};
pub use oracle::FaceOracle;
pub use outbound::ChatOutbound;
pub use pipeline::{BatchOutcome, MatchReport};
pub use registry::SessionRegistry;
pub use store::EncodingStore;
