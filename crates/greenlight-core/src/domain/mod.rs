/// Workflow instance domain models
pub mod instance;

/// Workflow template domain models
pub mod template;

/// Append-only audit trail
pub mod history;

/// Notification kinds
pub mod notification;

/// Collaborator interfaces
pub mod repository;
