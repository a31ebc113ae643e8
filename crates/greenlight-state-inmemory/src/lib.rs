//! In-memory state store implementation for the Greenlight engine
//!
//! This crate provides in-memory implementations of the collaborator traits
//! defined in greenlight-core. It is primarily useful for development,
//! testing, and simple deployments where persistence is not required. The
//! instance repository honors the same optimistic-concurrency contract a
//! durable backend must provide.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Instance and template stores
pub mod repositories;
pub use repositories::{InMemoryTemplateStore, InMemoryWorkflowInstanceRepository};

/// Recording notifier
pub mod notifier;
pub use notifier::RecordingNotifier;

/// Controllable time source
pub mod clock;
pub use clock::ManualClock;
