use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use greenlight_core::{
    domain::repository::{TemplateStore, WorkflowInstanceRepository},
    EngineError, InstanceId, TemplateId, UserId, WorkflowHistoryEntry, WorkflowInstance,
    WorkflowTemplate,
};

/// In-memory implementation of the workflow instance repository
///
/// Saves honor the optimistic-concurrency contract: the caller's instance
/// carries the version it was read at, and a save against a row that has
/// moved on fails with `VersionConflict`. The persisted copy carries the
/// read version plus one.
pub struct InMemoryWorkflowInstanceRepository {
    instances: Arc<DashMap<String, WorkflowInstance>>,
    history: Arc<DashMap<String, Vec<WorkflowHistoryEntry>>>,
}

impl InMemoryWorkflowInstanceRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self {
            instances: Arc::new(DashMap::with_capacity(64)),
            history: Arc::new(DashMap::with_capacity(64)),
        }
    }
}

impl Default for InMemoryWorkflowInstanceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowInstanceRepository for InMemoryWorkflowInstanceRepository {
    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<WorkflowInstance>, EngineError> {
        Ok(self.instances.get(&id.0).map(|instance| instance.clone()))
    }

    async fn save(&self, instance: &WorkflowInstance) -> Result<(), EngineError> {
        let mut persisted = instance.clone();
        persisted.version += 1;

        // The version check and the write happen under one entry guard so
        // two saves from the same pre-state cannot both pass the check.
        match self.instances.entry(instance.id.0.clone()) {
            Entry::Occupied(mut stored) => {
                if stored.get().version != instance.version {
                    return Err(EngineError::VersionConflict(format!(
                        "Instance {} was saved at version {}, stored version is {}",
                        instance.id.0,
                        instance.version,
                        stored.get().version
                    )));
                }
                stored.insert(persisted);
            }
            Entry::Vacant(slot) => {
                slot.insert(persisted);
            }
        }

        debug!(instance_id = %instance.id.0, version = instance.version + 1, "instance saved");
        Ok(())
    }

    async fn append_history(&self, entry: &WorkflowHistoryEntry) -> Result<(), EngineError> {
        self.history
            .entry(entry.workflow_instance_id.0.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn history_for(
        &self,
        id: &InstanceId,
    ) -> Result<Vec<WorkflowHistoryEntry>, EngineError> {
        let mut entries = self
            .history
            .get(&id.0)
            .map(|entries| entries.clone())
            .unwrap_or_default();

        entries.sort_by_key(|entry| entry.timestamp);
        Ok(entries)
    }

    async fn list_active(&self) -> Result<Vec<WorkflowInstance>, EngineError> {
        Ok(self
            .instances
            .iter()
            .filter(|instance| !instance.status.is_terminal())
            .map(|instance| instance.clone())
            .collect())
    }

    async fn find_by_assignee(
        &self,
        user: &UserId,
    ) -> Result<Vec<WorkflowInstance>, EngineError> {
        Ok(self
            .instances
            .iter()
            .filter(|instance| {
                !instance.status.is_terminal()
                    && instance.current_assignee.as_ref() == Some(user)
            })
            .map(|instance| instance.clone())
            .collect())
    }

    async fn find_all_for_template(
        &self,
        template_id: &TemplateId,
    ) -> Result<Vec<WorkflowInstance>, EngineError> {
        Ok(self
            .instances
            .iter()
            .filter(|instance| instance.template_id == *template_id)
            .map(|instance| instance.clone())
            .collect())
    }
}

/// In-memory implementation of the template store
pub struct InMemoryTemplateStore {
    templates: Arc<RwLock<HashMap<String, WorkflowTemplate>>>,
}

impl InMemoryTemplateStore {
    /// Create a new empty template store
    pub fn new() -> Self {
        Self {
            templates: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a template
    ///
    /// Authoring is out of the engine's scope; this exists so embedders and
    /// tests can seed the store.
    pub fn insert(&self, template: WorkflowTemplate) -> Result<(), EngineError> {
        let mut templates = self.templates.write().map_err(|e| {
            EngineError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        templates.insert(template.id.0.clone(), template);
        Ok(())
    }
}

impl Default for InMemoryTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn find_by_id(
        &self,
        id: &TemplateId,
    ) -> Result<Option<WorkflowTemplate>, EngineError> {
        let templates = self.templates.read().map_err(|e| {
            EngineError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(templates.get(&id.0).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use greenlight_core::{DataPacket, StepDefinition, TenantId, WorkflowType};

    fn template() -> WorkflowTemplate {
        WorkflowTemplate::new(
            TemplateId("tpl-1".to_string()),
            TenantId("tenant-1".to_string()),
            WorkflowType::CodeReview,
            vec![StepDefinition::assigned_to(
                "Review",
                UserId("alice".to_string()),
                None,
            )],
        )
    }

    fn instance() -> WorkflowInstance {
        WorkflowInstance::new(
            &template(),
            UserId("init".to_string()),
            DataPacket::null(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryWorkflowInstanceRepository::new();
        let instance = instance();

        repo.save(&instance).await.unwrap();

        let found = repo.find_by_id(&instance.id).await.unwrap().unwrap();
        assert_eq!(found.id, instance.id);
        assert_eq!(found.version, instance.version + 1);
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let repo = InMemoryWorkflowInstanceRepository::new();
        let stale = instance();

        repo.save(&stale).await.unwrap();

        // A concurrent writer reloads and saves first.
        let fresh = repo.find_by_id(&stale.id).await.unwrap().unwrap();
        repo.save(&fresh).await.unwrap();

        // The stale copy's version no longer matches.
        let err = repo.save(&stale).await.unwrap_err();
        assert!(matches!(err, EngineError::VersionConflict(_)));
        assert!(err.is_retryable());

        // The stored state is the fresh write, untouched by the rejection.
        let stored = repo.find_by_id(&stale.id).await.unwrap().unwrap();
        assert_eq!(stored.version, fresh.version + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_from_same_read_admit_exactly_one() {
        let repo = Arc::new(InMemoryWorkflowInstanceRepository::new());

        for _ in 0..1000 {
            let fresh = instance();
            repo.save(&fresh).await.unwrap();
            let read = repo.find_by_id(&fresh.id).await.unwrap().unwrap();

            let barrier = Arc::new(tokio::sync::Barrier::new(2));
            let mut writers = Vec::new();
            for _ in 0..2 {
                let repo = repo.clone();
                let copy = read.clone();
                let barrier = barrier.clone();
                writers.push(tokio::spawn(async move {
                    barrier.wait().await;
                    repo.save(&copy).await
                }));
            }

            let mut admitted = 0;
            let mut rejected = 0;
            for writer in writers {
                match writer.await.unwrap() {
                    Ok(()) => admitted += 1,
                    Err(EngineError::VersionConflict(_)) => rejected += 1,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            assert_eq!((admitted, rejected), (1, 1));

            let stored = repo.find_by_id(&fresh.id).await.unwrap().unwrap();
            assert_eq!(stored.version, read.version + 1);
        }
    }

    #[tokio::test]
    async fn test_history_sorted_ascending() {
        use greenlight_core::{actions, WorkflowStatus};

        let repo = InMemoryWorkflowInstanceRepository::new();
        let id = InstanceId("inst-1".to_string());
        let base = Utc::now();

        // Appended out of order on purpose.
        for offset in [2i64, 0, 1] {
            repo.append_history(&WorkflowHistoryEntry::new(
                id.clone(),
                base + chrono::Duration::seconds(offset),
                actions::STEP_APPROVED,
                None,
                Some(0),
                WorkflowStatus::WaitingForApproval,
                WorkflowStatus::WaitingForApproval,
                None,
            ))
            .await
            .unwrap();
        }

        let entries = repo.history_for(&id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_list_active_excludes_terminal() {
        let repo = InMemoryWorkflowInstanceRepository::new();
        let tpl = template();
        let now = Utc::now();

        let live = instance();
        let mut done = WorkflowInstance::new(
            &tpl,
            UserId("init".to_string()),
            DataPacket::null(),
            now,
        );
        done.cancel(now).unwrap();

        repo.save(&live).await.unwrap();
        repo.save(&done).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, live.id);
    }

    #[tokio::test]
    async fn test_find_by_assignee() {
        let repo = InMemoryWorkflowInstanceRepository::new();
        let tpl = template();
        let now = Utc::now();

        let mut assigned = instance();
        assigned.start(&tpl, now).unwrap();
        repo.save(&assigned).await.unwrap();

        let unstarted = instance();
        repo.save(&unstarted).await.unwrap();

        let alice = repo
            .find_by_assignee(&UserId("alice".to_string()))
            .await
            .unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, assigned.id);

        let bob = repo
            .find_by_assignee(&UserId("bob".to_string()))
            .await
            .unwrap();
        assert!(bob.is_empty());
    }

    #[tokio::test]
    async fn test_template_store_round_trip() {
        let store = InMemoryTemplateStore::new();
        let tpl = template();

        store.insert(tpl.clone()).unwrap();

        let found = store.find_by_id(&tpl.id).await.unwrap().unwrap();
        assert_eq!(found, tpl);

        let missing = store
            .find_by_id(&TemplateId("absent".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
