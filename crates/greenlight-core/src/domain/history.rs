use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instance::{InstanceId, UserId, WorkflowStatus};

/// Action codes recorded in the audit trail, one per transition
pub mod actions {
    /// Instance created from a template
    pub const WORKFLOW_CREATED: &str = "WORKFLOW_CREATED";
    /// Instance started and entered its first step
    pub const WORKFLOW_STARTED: &str = "WORKFLOW_STARTED";
    /// Current step approved
    pub const STEP_APPROVED: &str = "STEP_APPROVED";
    /// Workflow rejected
    pub const WORKFLOW_REJECTED: &str = "WORKFLOW_REJECTED";
    /// Reviewer requested changes
    pub const CHANGES_REQUESTED: &str = "CHANGES_REQUESTED";
    /// On-hold workflow returned to its waiting step
    pub const WORKFLOW_RESUMED: &str = "WORKFLOW_RESUMED";
    /// Workflow cancelled
    pub const WORKFLOW_CANCELLED: &str = "WORKFLOW_CANCELLED";
    /// SLA breach escalation raised by the sweep
    pub const ESCALATED: &str = "ESCALATED";
}

/// One append-only audit trail entry
///
/// History is immutable and strictly timestamp-ordered per instance; it is
/// never edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowHistoryEntry {
    /// Unique identifier
    pub id: String,

    /// Instance the entry belongs to
    pub workflow_instance_id: InstanceId,

    /// When the transition happened
    pub timestamp: DateTime<Utc>,

    /// Action code, e.g. "STEP_APPROVED"
    pub action: String,

    /// Who acted; None for system actions such as SLA escalation
    pub user: Option<UserId>,

    /// Step index at the time of the transition, if the workflow was on a
    /// step
    pub step_index: Option<usize>,

    /// Status before the transition
    pub previous_status: WorkflowStatus,

    /// Status after the transition
    pub new_status: WorkflowStatus,

    /// Free-form comments (rejection reason, change requests, breach
    /// description)
    pub comments: Option<String>,
}

impl WorkflowHistoryEntry {
    /// Create a new history entry
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workflow_instance_id: InstanceId,
        timestamp: DateTime<Utc>,
        action: &str,
        user: Option<UserId>,
        step_index: Option<usize>,
        previous_status: WorkflowStatus,
        new_status: WorkflowStatus,
        comments: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_instance_id,
            timestamp,
            action: action.to_string(),
            user,
            step_index,
            previous_status,
            new_status,
            comments,
        }
    }
}
