use serde::{Deserialize, Serialize};

/// Notification kinds handed to the notifier collaborator
///
/// The engine fires exactly one of these after each persisted transition;
/// delivery transport (email, SMS, push) is the notifier's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// A step is waiting for the recipient's decision
    ApprovalRequired,
    /// All approval steps passed
    WorkflowApproved,
    /// Workflow ran to completion without approvals
    WorkflowCompleted,
    /// An approver rejected the workflow
    WorkflowRejected,
    /// A reviewer requested changes
    ChangesRequested,
    /// Workflow cancelled
    WorkflowCancelled,
    /// SLA breached; workflow escalated
    WorkflowEscalated,
}

impl NotificationType {
    /// Stable wire code for the notification, used by delivery templates
    pub fn code(&self) -> &'static str {
        match self {
            NotificationType::ApprovalRequired => "workflow.approval_required",
            NotificationType::WorkflowApproved => "workflow.approved",
            NotificationType::WorkflowCompleted => "workflow.completed",
            NotificationType::WorkflowRejected => "workflow.rejected",
            NotificationType::ChangesRequested => "workflow.changes_requested",
            NotificationType::WorkflowCancelled => "workflow.cancelled",
            NotificationType::WorkflowEscalated => "workflow.escalated",
        }
    }
}
