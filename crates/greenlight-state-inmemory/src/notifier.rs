use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use greenlight_core::{
    domain::repository::Notifier, EngineError, InstanceId, NotificationType,
};

/// Notifier that records every dispatch instead of delivering it
///
/// Used by tests and local development to assert on notification ordering
/// and on the persist-then-notify contract. `set_failing(true)` makes every
/// subsequent send fail, for exercising partial-failure paths.
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(InstanceId, NotificationType)>>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Create a new recording notifier that accepts every send
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every notification recorded so far, in dispatch order
    pub fn sent(&self) -> Vec<(InstanceId, NotificationType)> {
        self.sent.lock().expect("notifier log poisoned").clone()
    }

    /// Notifications recorded for one instance
    pub fn sent_for(&self, instance_id: &InstanceId) -> Vec<NotificationType> {
        self.sent
            .lock()
            .expect("notifier log poisoned")
            .iter()
            .filter(|(id, _)| id == instance_id)
            .map(|(_, notification)| *notification)
            .collect()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        instance_id: &InstanceId,
        notification: NotificationType,
    ) -> Result<(), EngineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::NotificationError(
                "notifier configured to fail".to_string(),
            ));
        }

        debug!(
            instance_id = %instance_id.0,
            notification = notification.code(),
            "notification recorded"
        );
        self.sent
            .lock()
            .map_err(|e| EngineError::NotificationError(format!("notifier log poisoned: {}", e)))?
            .push((instance_id.clone(), notification));
        Ok(())
    }
}
