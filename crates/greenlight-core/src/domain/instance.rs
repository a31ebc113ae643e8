use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::template::WorkflowTemplate;
use crate::{DataPacket, EngineError};

/// Workflow instance status
///
/// `PendingApproval` in older persisted rows is the same state as
/// `WaitingForApproval`; it is accepted as a serde alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    /// Instance exists but has not been started
    Created,
    /// Queued for execution (legacy state, not produced by the engine)
    Pending,
    /// A step is underway
    InProgress,
    /// The current step is waiting for an approver to act
    #[serde(alias = "PendingApproval")]
    WaitingForApproval,
    /// All approval steps passed; terminal
    Approved,
    /// An approver rejected the workflow; terminal
    Rejected,
    /// The workflow was cancelled; terminal
    Cancelled,
    /// A reviewer requested changes; waiting for resubmission
    OnHold,
    /// The workflow lapsed without completing; terminal
    Expired,
    /// The current step breached its SLA; an alarm state, still actionable
    Escalated,
    /// The workflow ran to completion without approvals; terminal
    Completed,
    /// Status could not be determined (legacy rows)
    Unknown,
}

impl WorkflowStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Approved
                | WorkflowStatus::Rejected
                | WorkflowStatus::Cancelled
                | WorkflowStatus::Completed
                | WorkflowStatus::Expired
        )
    }

    /// Statuses from which an approver decision (approve, reject, request
    /// changes) is accepted. Escalated is an alarm, not a dead end.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::WaitingForApproval
                | WorkflowStatus::InProgress
                | WorkflowStatus::Escalated
        )
    }
}

/// Value object: workflow instance ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

/// Value object: workflow template ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

/// Value object: tenant ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Value object: user ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Aggregate: workflow instance
///
/// One running execution of a workflow template. All transitions take the
/// current time from the caller so SLA math is deterministic under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique identifier
    pub id: InstanceId,

    /// Template this instance was created from
    pub template_id: TemplateId,

    /// Workflow kind, denormalized from the template for assignment queries
    pub workflow_type: super::template::WorkflowType,

    /// Owning tenant; never changes after creation
    pub tenant_id: TenantId,

    /// User who created the instance
    pub initiator: UserId,

    /// Current status
    pub status: WorkflowStatus,

    /// 0-based index of the current step; None before start and after a
    /// terminal transition
    pub current_step_index: Option<usize>,

    /// Steps passed so far; drives the progress projection
    pub completed_steps: usize,

    /// User the current step is assigned to, if the step names one
    pub current_assignee: Option<UserId>,

    /// Opaque caller-defined payload
    pub workflow_data: DataPacket,

    /// When the current step breaches its SLA; None if the step has no SLA
    pub due_date: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When the workflow was started
    pub started_at: Option<DateTime<Utc>>,

    /// When the workflow reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency token; bumped by the repository on every save
    pub version: u64,
}

impl WorkflowInstance {
    /// Create a new instance from a template
    pub fn new(
        template: &WorkflowTemplate,
        initiator: UserId,
        workflow_data: DataPacket,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InstanceId(Uuid::new_v4().to_string()),
            template_id: template.id.clone(),
            workflow_type: template.workflow_type,
            tenant_id: template.tenant_id.clone(),
            initiator,
            status: WorkflowStatus::Created,
            current_step_index: None,
            completed_steps: 0,
            current_assignee: None,
            workflow_data,
            due_date: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            version: 0,
        }
    }

    /// Start the workflow at step 0
    pub fn start(
        &mut self,
        template: &WorkflowTemplate,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if self.status != WorkflowStatus::Created {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot start workflow in state: {:?}",
                self.status
            )));
        }

        self.started_at = Some(now);

        if template.total_steps() == 0 {
            // Nothing to approve; the workflow runs to completion immediately.
            self.finish(WorkflowStatus::Completed, now);
            return Ok(());
        }

        self.enter_step(template, 0, now);
        Ok(())
    }

    /// Approve the current step and advance (or terminate on the last step)
    pub fn approve(
        &mut self,
        template: &WorkflowTemplate,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !self.status.is_actionable() {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot approve workflow in state: {:?}",
                self.status
            )));
        }

        let current = self.current_step_index.ok_or_else(|| {
            EngineError::InvalidStateTransition(
                "Workflow has no current step to approve".to_string(),
            )
        })?;

        self.completed_steps += 1;
        self.enter_step(template, current + 1, now);
        Ok(())
    }

    /// Reject the workflow, terminal regardless of step index
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if !(self.status.is_actionable() || self.status == WorkflowStatus::OnHold) {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot reject workflow in state: {:?}",
                self.status
            )));
        }

        self.finish(WorkflowStatus::Rejected, now);
        Ok(())
    }

    /// Put the workflow on hold while changes are made; the step index and
    /// assignee stay in place for resubmission
    pub fn hold(&mut self, _now: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.status.is_actionable() {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot request changes on workflow in state: {:?}",
                self.status
            )));
        }

        self.status = WorkflowStatus::OnHold;
        Ok(())
    }

    /// Return an on-hold workflow to its waiting step
    pub fn resume(&mut self, _now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.status != WorkflowStatus::OnHold {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot resume workflow in state: {:?}",
                self.status
            )));
        }

        self.status = WorkflowStatus::WaitingForApproval;
        Ok(())
    }

    /// Cancel the workflow from any non-terminal status
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot cancel workflow in state: {:?}",
                self.status
            )));
        }

        self.finish(WorkflowStatus::Cancelled, now);
        Ok(())
    }

    /// Raise the SLA-breach alarm; the step index and assignee are retained
    /// so the instance stays approvable
    pub fn escalate(&mut self, _now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.status.is_terminal() || self.status == WorkflowStatus::Escalated {
            return Err(EngineError::InvalidStateTransition(format!(
                "Cannot escalate workflow in state: {:?}",
                self.status
            )));
        }

        self.status = WorkflowStatus::Escalated;
        Ok(())
    }

    /// Overwrite the opaque payload. Returns false on terminal instances
    /// instead of erroring; a stale update is caller-correctable.
    pub fn update_data(&mut self, workflow_data: DataPacket) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.workflow_data = workflow_data;
        true
    }

    /// Whether the current step's SLA has elapsed while the workflow is
    /// still live
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => due < now && !self.status.is_terminal(),
            None => false,
        }
    }

    /// Make `index` the current step, skipping approval-free steps. Runs off
    /// the end of the template when every remaining step is automatic, which
    /// terminates the workflow.
    fn enter_step(&mut self, template: &WorkflowTemplate, index: usize, now: DateTime<Utc>) {
        let mut index = index;

        while let Some(step) = template.step(index) {
            if step.approver.requires_approval() {
                self.current_step_index = Some(index);
                self.current_assignee = step.approver.primary_assignee();
                self.due_date = step
                    .sla
                    .and_then(|sla| chrono::Duration::from_std(sla).ok())
                    .map(|sla| now + sla);
                self.status = WorkflowStatus::WaitingForApproval;
                return;
            }

            self.completed_steps += 1;
            index += 1;
        }

        // Every step passed.
        self.finish(WorkflowStatus::Approved, now);
    }

    fn finish(&mut self, status: WorkflowStatus, now: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.current_step_index = None;
        self.current_assignee = None;
        self.due_date = None;
        self.completed_at = Some(now);
    }
}
