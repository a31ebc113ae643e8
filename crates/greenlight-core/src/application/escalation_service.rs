use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    domain::history::{actions, WorkflowHistoryEntry},
    domain::instance::{WorkflowInstance, WorkflowStatus},
    domain::notification::NotificationType,
    domain::repository::{Clock, Notifier, TemplateStore, WorkflowInstanceRepository},
    EngineError,
};

/// SLA breach sweep
///
/// Runs on a recurring schedule driven by an external scheduler. The sweep
/// is stateless: everything needed to decide "is this breached" is
/// recomputed from the persisted due date and status on each invocation, and
/// the already-Escalated check de-duplicates repeat runs within the same
/// breach window.
pub struct EscalationService {
    /// Repository for workflow instances and history
    instance_repo: Arc<dyn WorkflowInstanceRepository>,

    /// Template source, used to describe the breached SLA
    template_store: Arc<dyn TemplateStore>,

    /// Fire-and-forget notification dispatch
    notifier: Arc<dyn Notifier>,

    /// Time source
    clock: Arc<dyn Clock>,
}

impl EscalationService {
    /// Create a new escalation service
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

    /// Escalate every live instance whose due date has passed
    ///
    /// Returns the count of instances newly escalated in this invocation.
    /// A single instance failing to persist does not stop the sweep; the
    /// count is best-effort.
    pub async fn process_sla_breaches(&self) -> Result<usize, EngineError> {
        let now = self.clock.now();
        let active = self.instance_repo.list_active().await?;

        let mut escalated = 0usize;

        for mut instance in active {
            if !matches!(
                instance.status,
                WorkflowStatus::WaitingForApproval
                    | WorkflowStatus::InProgress
                    | WorkflowStatus::OnHold
            ) {
                continue;
            }
            if !instance.is_overdue(now) {
                continue;
            }

            let previous_status = instance.status;
            if let Err(e) = instance.escalate(now) {
                warn!(instance_id = %instance.id.0, error = %e, "escalation rejected");
                continue;
            }

            let reason = self.breach_description(&instance).await;

            if let Err(e) = self.instance_repo.save(&instance).await {
                warn!(instance_id = %instance.id.0, error = %e, "failed to persist escalation");
                continue;
            }

            let entry = WorkflowHistoryEntry::new(
                instance.id.clone(),
                now,
                actions::ESCALATED,
                None,
                instance.current_step_index,
                previous_status,
                instance.status,
                Some(reason.clone()),
            );
            if let Err(e) = self.instance_repo.append_history(&entry).await {
                warn!(instance_id = %instance.id.0, error = %e, "failed to record escalation");
            }

            if let Err(e) = self
                .notifier
                .send(&instance.id, NotificationType::WorkflowEscalated)
                .await
            {
                warn!(instance_id = %instance.id.0, error = %e, "escalation notification failed");
            }

            info!(instance_id = %instance.id.0, reason = %reason, "workflow escalated");
            escalated += 1;
        }

        Ok(escalated)
    }

    /// Human-readable description of the breach, e.g.
    /// "Step 1 exceeded SLA of 24h".
    async fn breach_description(&self, instance: &WorkflowInstance) -> String {
        let step_index = instance.current_step_index.unwrap_or_default();

        let sla = match self.template_store.find_by_id(&instance.template_id).await {
            Ok(Some(template)) => template.step(step_index).and_then(|step| step.sla),
            _ => None,
        };

        match sla {
            Some(sla) => {
                let hours = sla.as_secs() / 3600;
                if hours > 0 {
                    format!("Step {} exceeded SLA of {}h", step_index, hours)
                } else {
                    format!("Step {} exceeded SLA of {}m", step_index, sla.as_secs() / 60)
                }
            }
            None => format!("Step {} exceeded its SLA", step_index),
        }
    }
}
