use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::instance::{TemplateId, TenantId, UserId};

/// Closed set of workflow kinds the platform ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowType {
    /// Business requirements document sign-off
    BrdApproval,
    /// Code review chain
    CodeReview,
    /// Security review chain
    SecurityReview,
    /// Deployment / release approval
    DeploymentApproval,
    /// Compliance review chain
    ComplianceReview,
    /// Tenant-defined workflow
    Custom,
}

/// Who must act on a step before the workflow may advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApproverRequirement {
    /// Any member of the named role may approve. Role membership is resolved
    /// by the authorization collaborator, so the step carries no concrete
    /// assignee.
    Role(String),
    /// An explicit approver set; the first user is the primary assignee.
    Users(Vec<UserId>),
    /// No approval required; the engine advances through the step
    /// immediately.
    Automatic,
}

impl ApproverRequirement {
    /// The concrete user the step is assigned to, if any
    pub fn primary_assignee(&self) -> Option<UserId> {
        match self {
            ApproverRequirement::Users(users) => users.first().cloned(),
            ApproverRequirement::Role(_) | ApproverRequirement::Automatic => None,
        }
    }

    /// Whether the step rests waiting for a human decision
    pub fn requires_approval(&self) -> bool {
        !matches!(self, ApproverRequirement::Automatic)
    }
}

/// One ordered stage of a workflow template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Human-readable step name
    pub name: String,

    /// Who must approve this step
    pub approver: ApproverRequirement,

    /// Time allowed on this step before it counts as breached; no SLA if
    /// absent
    pub sla: Option<Duration>,
}

impl StepDefinition {
    /// Create an approval step assigned to an explicit user
    pub fn assigned_to(name: &str, user: UserId, sla: Option<Duration>) -> Self {
        Self {
            name: name.to_string(),
            approver: ApproverRequirement::Users(vec![user]),
            sla,
        }
    }

    /// Create a role-addressed approval step
    pub fn for_role(name: &str, role: &str, sla: Option<Duration>) -> Self {
        Self {
            name: name.to_string(),
            approver: ApproverRequirement::Role(role.to_string()),
            sla,
        }
    }

    /// Create an approval-free step
    pub fn automatic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            approver: ApproverRequirement::Automatic,
            sla: None,
        }
    }
}

/// Aggregate: workflow template
///
/// Read-only to the engine. Step order is immutable once any instance
/// references the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Unique identifier
    pub id: TemplateId,

    /// Owning tenant
    pub tenant_id: TenantId,

    /// Workflow kind
    pub workflow_type: WorkflowType,

    /// Ordered sequence of steps
    pub steps: Vec<StepDefinition>,
}

impl WorkflowTemplate {
    /// Create a new template
    pub fn new(
        id: TemplateId,
        tenant_id: TenantId,
        workflow_type: WorkflowType,
        steps: Vec<StepDefinition>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            workflow_type,
            steps,
        }
    }

    /// Number of steps in the template
    #[inline]
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Look up a step by index
    #[inline]
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }
}
