//!
//! Greenlight Core - workflow approval engine
//!
//! This crate defines the domain model and application services that drive a
//! workflow instance through an ordered sequence of approval steps: creation
//! from a template, step advancement, rejection and cancellation, SLA breach
//! escalation, and status/history projection. Persistence, notification
//! delivery, and authorization are consumed through the collaborator traits
//! in [`domain::repository`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Domain layer - core business models, entities, and rules
pub mod domain;

/// Application services - core application logic
pub mod application;

/// Core types
pub mod types;

/// Error types
pub mod error;

// Re-export key types
pub use error::EngineError;
pub use types::DataPacket;

// Re-export main API types for easy use
pub use application::engine::WorkflowEngine;
pub use application::escalation_service::EscalationService;
pub use application::status_service::{StatusService, WorkflowStatusView};
pub use domain::history::{actions, WorkflowHistoryEntry};
pub use domain::instance::{
    InstanceId, TemplateId, TenantId, UserId, WorkflowInstance, WorkflowStatus,
};
pub use domain::notification::NotificationType;
pub use domain::repository::{
    Clock, Notifier, SystemClock, TemplateStore, WorkflowInstanceRepository,
};
pub use domain::template::{
    ApproverRequirement, StepDefinition, WorkflowTemplate, WorkflowType,
};

/// Outcome of a successful transition operation
///
/// Carries the resulting status and whether the follow-up notification was
/// delivered, so callers can render partial-failure states ("approved, but
/// notification failed") without treating the transition as failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Instance the operation acted on
    pub instance_id: InstanceId,

    /// Status after the transition
    pub status: WorkflowStatus,

    /// Human-readable summary of what happened
    pub message: String,

    /// Whether the notifier accepted the follow-up notification
    pub notification_delivered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_serialization() {
        let result = ExecutionResult {
            instance_id: InstanceId("inst-1".to_string()),
            status: WorkflowStatus::WaitingForApproval,
            message: "Step approved; waiting on step 1".to_string(),
            notification_delivered: true,
        };

        let serialized = serde_json::to_string(&result).unwrap();
        let deserialized: ExecutionResult = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, result);
    }
}
