//! Collaborator traits for the Greenlight engine
//!
//! This module defines the contracts the engine consumes. External crates
//! implement these traits to provide different persistence mechanisms,
//! notification transports, and clocks. Every implementation is expected to
//! scope reads and writes to the calling tenant; the engine does not enforce
//! tenancy itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::history::WorkflowHistoryEntry;
use super::instance::{InstanceId, TemplateId, UserId, WorkflowInstance};
use super::notification::NotificationType;
use super::template::WorkflowTemplate;
use crate::EngineError;

/// Repository for workflow instances and their history
///
/// `save` must honor the optimistic-concurrency token: the instance carries
/// the version it was read at, and a save against a row that has moved on
/// must fail with `EngineError::VersionConflict` rather than losing the
/// concurrent update.
#[async_trait]
pub trait WorkflowInstanceRepository: Send + Sync {
    /// Find a workflow instance by ID
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<WorkflowInstance>, EngineError>;

    /// Persist an instance, rejecting stale writes
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), EngineError>;

    /// Append one immutable history entry
    async fn append_history(&self, entry: &WorkflowHistoryEntry) -> Result<(), EngineError>;

    /// History entries for an instance in ascending timestamp order
    async fn history_for(
        &self,
        id: &InstanceId,
    ) -> Result<Vec<WorkflowHistoryEntry>, EngineError>;

    /// All non-terminal instances visible to the caller
    async fn list_active(&self) -> Result<Vec<WorkflowInstance>, EngineError>;

    /// Non-terminal instances currently assigned to a user
    async fn find_by_assignee(&self, user: &UserId)
        -> Result<Vec<WorkflowInstance>, EngineError>;

    /// All instances created from a template
    async fn find_all_for_template(
        &self,
        template_id: &TemplateId,
    ) -> Result<Vec<WorkflowInstance>, EngineError>;
}

/// Read-only source of workflow templates
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Find a template by ID
    async fn find_by_id(&self, id: &TemplateId)
        -> Result<Option<WorkflowTemplate>, EngineError>;
}

/// Fire-and-forget notification dispatch
///
/// The engine persists state before calling this and never retries; a failed
/// send is logged by the caller and surfaced as an undelivered notification,
/// not as a failed transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a notification about an instance
    async fn send(
        &self,
        instance_id: &InstanceId,
        notification: NotificationType,
    ) -> Result<(), EngineError>;
}

/// Source of the current time
///
/// Injected so SLA math is deterministic under test.
pub trait Clock: Send + Sync {
    /// The current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
