use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    domain::history::{actions, WorkflowHistoryEntry},
    domain::instance::{InstanceId, TemplateId, UserId, WorkflowInstance, WorkflowStatus},
    domain::notification::NotificationType,
    domain::repository::{Clock, Notifier, TemplateStore, WorkflowInstanceRepository},
    domain::template::WorkflowTemplate,
    DataPacket, EngineError, ExecutionResult,
};

/// Service driving workflow instances through their approval steps
///
/// The engine holds no state between calls; every operation loads the
/// instance from the repository, applies one transition, persists the new
/// state plus a history entry, and then fires a notification. Persist comes
/// before notify: a notifier outage never rolls back a committed transition.
pub struct WorkflowEngine {
    /// Repository for workflow instances and history
    instance_repo: Arc<dyn WorkflowInstanceRepository>,

    /// Read-only template source
    template_store: Arc<dyn TemplateStore>,

    /// Fire-and-forget notification dispatch
    notifier: Arc<dyn Notifier>,

    /// Time source
    clock: Arc<dyn Clock>,
}

impl WorkflowEngine {
    /// Create a new workflow engine
    pub fn new(
        instance_repo: Arc<dyn WorkflowInstanceRepository>,
        template_store: Arc<dyn TemplateStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instance_repo,
            template_store,
            notifier,
            clock,
        }
    }

    /// Create a new instance from a template
    ///
    /// The instance starts in `Created`; `start_workflow` moves it onto its
    /// first step.
    pub async fn create_instance(
        &self,
        template_id: &TemplateId,
        initiator: UserId,
        workflow_data: Option<DataPacket>,
    ) -> Result<WorkflowInstance, EngineError> {
        let template = self.load_template(template_id).await?;
        let now = self.clock.now();

        let instance = WorkflowInstance::new(
            &template,
            initiator.clone(),
            workflow_data.unwrap_or_default(),
            now,
        );

        self.instance_repo.save(&instance).await?;
        self.instance_repo
            .append_history(&WorkflowHistoryEntry::new(
                instance.id.clone(),
                now,
                actions::WORKFLOW_CREATED,
                Some(initiator),
                None,
                WorkflowStatus::Created,
                WorkflowStatus::Created,
                None,
            ))
            .await?;

        info!(
            instance_id = %instance.id.0,
            template_id = %template_id.0,
            "workflow instance created"
        );

        Ok(instance)
    }

    /// Start a created workflow at its first step
    pub async fn start_workflow(
        &self,
        instance_id: &InstanceId,
    ) -> Result<ExecutionResult, EngineError> {
        let mut instance = self.load_instance(instance_id).await?;
        let template = self.load_template(&instance.template_id).await?;
        let now = self.clock.now();
        let previous_status = instance.status;

        instance.start(&template, now)?;

        let entry = WorkflowHistoryEntry::new(
            instance.id.clone(),
            now,
            actions::WORKFLOW_STARTED,
            None,
            instance.current_step_index,
            previous_status,
            instance.status,
            None,
        );
        self.commit(&instance, &entry).await?;

        let notification = match instance.status {
            WorkflowStatus::WaitingForApproval => NotificationType::ApprovalRequired,
            WorkflowStatus::Approved => NotificationType::WorkflowApproved,
            _ => NotificationType::WorkflowCompleted,
        };
        let delivered = self.notify(&instance.id, notification).await;

        info!(instance_id = %instance.id.0, status = ?instance.status, "workflow started");

        Ok(ExecutionResult {
            instance_id: instance.id,
            status: instance.status,
            message: match instance.current_step_index {
                Some(step) => format!("Workflow started; waiting on step {}", step),
                None => "Workflow started and completed immediately".to_string(),
            },
            notification_delivered: delivered,
        })
    }

    /// Approve the current step
    ///
    /// The approver is assumed to be authorized already; the engine records
    /// who acted, it does not enforce role membership.
    pub async fn approve_step(
        &self,
        instance_id: &InstanceId,
        approver: UserId,
        comments: Option<String>,
    ) -> Result<ExecutionResult, EngineError> {
        let mut instance = self.load_instance(instance_id).await?;
        let template = self.load_template(&instance.template_id).await?;
        let now = self.clock.now();
        let previous_status = instance.status;
        let approved_step = instance.current_step_index;

        instance.approve(&template, now)?;

        let entry = WorkflowHistoryEntry::new(
            instance.id.clone(),
            now,
            actions::STEP_APPROVED,
            Some(approver),
            approved_step,
            previous_status,
            instance.status,
            comments,
        );
        self.commit(&instance, &entry).await?;

        let (notification, message) = if instance.status == WorkflowStatus::Approved {
            (
                NotificationType::WorkflowApproved,
                "All steps approved; workflow complete".to_string(),
            )
        } else {
            (
                NotificationType::ApprovalRequired,
                format!(
                    "Step approved; waiting on step {}",
                    instance.current_step_index.unwrap_or_default()
                ),
            )
        };
        let delivered = self.notify(&instance.id, notification).await;

        debug!(instance_id = %instance.id.0, status = ?instance.status, "step approved");

        Ok(ExecutionResult {
            instance_id: instance.id,
            status: instance.status,
            message,
            notification_delivered: delivered,
        })
    }

    /// Reject the workflow; terminal regardless of step index
    pub async fn reject_step(
        &self,
        instance_id: &InstanceId,
        approver: UserId,
        reason: &str,
    ) -> Result<ExecutionResult, EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "Rejection reason must not be blank".to_string(),
            ));
        }

        let mut instance = self.load_instance(instance_id).await?;
        let now = self.clock.now();
        let previous_status = instance.status;
        let rejected_step = instance.current_step_index;

        instance.reject(now)?;

        let entry = WorkflowHistoryEntry::new(
            instance.id.clone(),
            now,
            actions::WORKFLOW_REJECTED,
            Some(approver),
            rejected_step,
            previous_status,
            instance.status,
            Some(reason.to_string()),
        );
        self.commit(&instance, &entry).await?;

        let delivered = self
            .notify(&instance.id, NotificationType::WorkflowRejected)
            .await;

        info!(instance_id = %instance.id.0, "workflow rejected");

        Ok(ExecutionResult {
            instance_id: instance.id,
            status: instance.status,
            message: format!("Workflow rejected: {}", reason),
            notification_delivered: delivered,
        })
    }

    /// Put the workflow on hold pending changes; the step and assignee stay
    /// in place for resubmission
    pub async fn request_changes(
        &self,
        instance_id: &InstanceId,
        reviewer: UserId,
        change_requests: &str,
    ) -> Result<ExecutionResult, EngineError> {
        let mut instance = self.load_instance(instance_id).await?;
        let now = self.clock.now();
        let previous_status = instance.status;

        instance.hold(now)?;

        let entry = WorkflowHistoryEntry::new(
            instance.id.clone(),
            now,
            actions::CHANGES_REQUESTED,
            Some(reviewer),
            instance.current_step_index,
            previous_status,
            instance.status,
            Some(change_requests.to_string()),
        );
        self.commit(&instance, &entry).await?;

        let delivered = self
            .notify(&instance.id, NotificationType::ChangesRequested)
            .await;

        Ok(ExecutionResult {
            instance_id: instance.id,
            status: instance.status,
            message: "Changes requested; workflow on hold".to_string(),
            notification_delivered: delivered,
        })
    }

    /// Return an on-hold workflow to its waiting step after resubmission
    pub async fn resume_workflow(
        &self,
        instance_id: &InstanceId,
        user: UserId,
    ) -> Result<ExecutionResult, EngineError> {
        let mut instance = self.load_instance(instance_id).await?;
        let now = self.clock.now();
        let previous_status = instance.status;

        instance.resume(now)?;

        let entry = WorkflowHistoryEntry::new(
            instance.id.clone(),
            now,
            actions::WORKFLOW_RESUMED,
            Some(user),
            instance.current_step_index,
            previous_status,
            instance.status,
            None,
        );
        self.commit(&instance, &entry).await?;

        let delivered = self
            .notify(&instance.id, NotificationType::ApprovalRequired)
            .await;

        Ok(ExecutionResult {
            instance_id: instance.id,
            status: instance.status,
            message: "Workflow resumed; waiting for approval".to_string(),
            notification_delivered: delivered,
        })
    }

    /// Cancel the workflow from any non-terminal status
    pub async fn cancel_workflow(
        &self,
        instance_id: &InstanceId,
        canceller: UserId,
        reason: Option<String>,
    ) -> Result<ExecutionResult, EngineError> {
        let mut instance = self.load_instance(instance_id).await?;
        let now = self.clock.now();
        let previous_status = instance.status;
        let cancelled_step = instance.current_step_index;

        instance.cancel(now)?;

        let entry = WorkflowHistoryEntry::new(
            instance.id.clone(),
            now,
            actions::WORKFLOW_CANCELLED,
            Some(canceller),
            cancelled_step,
            previous_status,
            instance.status,
            reason,
        );
        self.commit(&instance, &entry).await?;

        let delivered = self
            .notify(&instance.id, NotificationType::WorkflowCancelled)
            .await;

        info!(instance_id = %instance.id.0, "workflow cancelled");

        Ok(ExecutionResult {
            instance_id: instance.id,
            status: instance.status,
            message: "Workflow cancelled".to_string(),
            notification_delivered: delivered,
        })
    }

    /// Overwrite the opaque payload without touching status or step
    ///
    /// Returns false on terminal instances; that is a caller-correctable
    /// no-op, not an error.
    pub async fn update_workflow_data(
        &self,
        instance_id: &InstanceId,
        workflow_data: DataPacket,
    ) -> Result<bool, EngineError> {
        let mut instance = self.load_instance(instance_id).await?;

        if !instance.update_data(workflow_data) {
            debug!(instance_id = %instance.id.0, "payload update refused on terminal instance");
            return Ok(false);
        }

        self.instance_repo.save(&instance).await?;
        Ok(true)
    }

    async fn load_instance(&self, id: &InstanceId) -> Result<WorkflowInstance, EngineError> {
        self.instance_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::InstanceNotFound(id.0.clone()))
    }

    async fn load_template(&self, id: &TemplateId) -> Result<WorkflowTemplate, EngineError> {
        self.template_store
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::TemplateNotFound(id.0.clone()))
    }

    /// Persist the transition: instance state first, then its history entry.
    async fn commit(
        &self,
        instance: &WorkflowInstance,
        entry: &WorkflowHistoryEntry,
    ) -> Result<(), EngineError> {
        self.instance_repo.save(instance).await?;
        self.instance_repo.append_history(entry).await?;
        Ok(())
    }

    /// Dispatch a notification after the transition is committed. Failures
    /// are logged and reported as undelivered; they never fail the
    /// transition.
    async fn notify(&self, instance_id: &InstanceId, notification: NotificationType) -> bool {
        match self.notifier.send(instance_id, notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    instance_id = %instance_id.0,
                    notification = notification.code(),
                    error = %e,
                    "notification dispatch failed"
                );
                false
            }
        }
    }
}
