/// Workflow transition engine
pub mod engine;

/// SLA breach sweep and escalation
pub mod escalation_service;

/// Status, history, and work-queue projections
pub mod status_service;
