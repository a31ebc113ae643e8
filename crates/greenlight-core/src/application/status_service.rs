use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::history::WorkflowHistoryEntry,
    domain::instance::{InstanceId, UserId, WorkflowInstance, WorkflowStatus},
    domain::repository::{Clock, TemplateStore, WorkflowInstanceRepository},
    domain::template::WorkflowType,
    EngineError,
};

/// Read projection of a workflow instance's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatusView {
    /// Instance identifier
    pub instance_id: InstanceId,

    /// Current status
    pub status: WorkflowStatus,

    /// 0-based index of the current step, if the workflow is on one
    pub current_step_index: Option<usize>,

    /// Name of the current step from the template
    pub current_step_name: Option<String>,

    /// Total steps in the template
    pub total_steps: usize,

    /// User the current step is assigned to
    pub current_assignee: Option<UserId>,

    /// SLA deadline for the current step
    pub due_date: Option<DateTime<Utc>>,

    /// Whether the due date has passed while the workflow is live
    pub is_overdue: bool,

    /// Completed steps over total steps, as a percentage
    pub progress_percentage: f64,
}

/// Read-only status, history, and work-queue projections
///
/// Never mutates state; always reflects the latest persisted instance.
pub struct StatusService {
    /// Repository for workflow instances and history
    instance_repo: Arc<dyn WorkflowInstanceRepository>,

    /// Template source, used for step names and totals
    template_store: Arc<dyn TemplateStore>,

    /// Time source for overdue computation
    clock: Arc<dyn Clock>,
}

impl StatusService {
    /// Create a new status service
    pub fn new(
        instance_repo: Arc<dyn WorkflowInstanceRepository>,
        template_store: Arc<dyn TemplateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instance_repo,
            template_store,
            clock,
        }
    }

    /// Current status view for an instance
    pub async fn workflow_status(
        &self,
        instance_id: &InstanceId,
    ) -> Result<WorkflowStatusView, EngineError> {
        let instance = self
            .instance_repo
            .find_by_id(instance_id)
            .await?
            .ok_or_else(|| EngineError::InstanceNotFound(instance_id.0.clone()))?;

        let template = self
            .template_store
            .find_by_id(&instance.template_id)
            .await?
            .ok_or_else(|| EngineError::TemplateNotFound(instance.template_id.0.clone()))?;

        let now = self.clock.now();
        let current_step_name = instance
            .current_step_index
            .and_then(|index| template.step(index))
            .map(|step| step.name.clone());

        Ok(WorkflowStatusView {
            instance_id: instance.id.clone(),
            status: instance.status,
            current_step_index: instance.current_step_index,
            current_step_name,
            total_steps: template.total_steps(),
            current_assignee: instance.current_assignee.clone(),
            due_date: instance.due_date,
            is_overdue: instance.is_overdue(now),
            progress_percentage: progress_percentage(&instance, template.total_steps()),
        })
    }

    /// Audit trail for an instance in ascending timestamp order
    pub async fn workflow_history(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Vec<WorkflowHistoryEntry>, EngineError> {
        if self.instance_repo.find_by_id(instance_id).await?.is_none() {
            return Err(EngineError::InstanceNotFound(instance_id.0.clone()));
        }

        self.instance_repo.history_for(instance_id).await
    }

    /// Non-terminal instances waiting on a user, most urgent first
    ///
    /// Sorted by due date ascending with undated instances last; ordering
    /// beyond that is a convenience for urgency-based UIs, not a contract.
    pub async fn pending_approvals(
        &self,
        user: &UserId,
        workflow_type: Option<WorkflowType>,
    ) -> Result<Vec<WorkflowInstance>, EngineError> {
        let mut assigned = self.instance_repo.find_by_assignee(user).await?;

        assigned.retain(|instance| {
            !instance.status.is_terminal()
                && workflow_type.map_or(true, |wanted| instance.workflow_type == wanted)
        });

        assigned.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        Ok(assigned)
    }
}

/// Completed steps over total steps. A zero-step workflow is 100% once
/// terminal and 0% before.
fn progress_percentage(instance: &WorkflowInstance, total_steps: usize) -> f64 {
    if total_steps == 0 {
        if instance.status.is_terminal() {
            return 100.0;
        }
        return 0.0;
    }

    (instance.completed_steps as f64 / total_steps as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::{TemplateId, TenantId};
    use crate::domain::template::{StepDefinition, WorkflowTemplate};
    use crate::DataPacket;

    fn template(steps: Vec<StepDefinition>) -> WorkflowTemplate {
        WorkflowTemplate::new(
            TemplateId("tpl-1".to_string()),
            TenantId("tenant-1".to_string()),
            WorkflowType::BrdApproval,
            steps,
        )
    }

    fn instance(template: &WorkflowTemplate) -> WorkflowInstance {
        WorkflowInstance::new(
            template,
            UserId("init".to_string()),
            DataPacket::null(),
            Utc::now(),
        )
    }

    #[test]
    fn test_progress_zero_steps() {
        let template = template(vec![]);
        let mut inst = instance(&template);

        assert_eq!(progress_percentage(&inst, 0), 0.0);

        inst.start(&template, Utc::now()).unwrap();
        assert_eq!(inst.status, WorkflowStatus::Completed);
        assert_eq!(progress_percentage(&inst, 0), 100.0);
    }

    #[test]
    fn test_progress_advances_monotonically() {
        let template = template(vec![
            StepDefinition::assigned_to("a", UserId("u1".to_string()), None),
            StepDefinition::assigned_to("b", UserId("u2".to_string()), None),
            StepDefinition::assigned_to("c", UserId("u3".to_string()), None),
        ]);
        let mut inst = instance(&template);
        let now = Utc::now();

        inst.start(&template, now).unwrap();
        let mut last = progress_percentage(&inst, 3);
        assert_eq!(last, 0.0);

        for _ in 0..3 {
            inst.approve(&template, now).unwrap();
            let progress = progress_percentage(&inst, 3);
            assert!(progress >= last);
            last = progress;
        }

        assert_eq!(last, 100.0);
        assert_eq!(inst.status, WorkflowStatus::Approved);
    }

    #[test]
    fn test_progress_frozen_on_rejection() {
        let template = template(vec![
            StepDefinition::assigned_to("a", UserId("u1".to_string()), None),
            StepDefinition::assigned_to("b", UserId("u2".to_string()), None),
            StepDefinition::assigned_to("c", UserId("u3".to_string()), None),
        ]);
        let mut inst = instance(&template);
        let now = Utc::now();

        inst.start(&template, now).unwrap();
        inst.approve(&template, now).unwrap();
        inst.reject(now).unwrap();

        let progress = progress_percentage(&inst, 3);
        assert!((progress - 33.333).abs() < 0.01);
    }
}
