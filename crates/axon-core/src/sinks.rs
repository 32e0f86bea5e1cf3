//! Notification and activity-log sinks.
//!
//! The pipelines only depend on the trait contracts; the store-backed
//! implementations here write one row per call. Delivery transport beyond
//! the row write belongs to the host application.

use crate::shared::{ActivityEntry, Notification};
use crate::store::Store;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// In-app notification sink.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create_notification(
        &self,
        user_id: &str,
        notification_type: &str,
        title: &str,
        message: &str,
        link: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Activity-log sink.
#[async_trait::async_trait]
pub trait ActivityLog: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        user_id: &str,
        agent: &str,
        activity_type: &str,
        title: &str,
        description: &str,
        confidence: f32,
        metadata: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Store-backed notification sink.
pub struct StoreNotifier {
    store: Arc<Store>,
}

impl StoreNotifier {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl NotificationSink for StoreNotifier {
    async fn create_notification(
        &self,
        user_id: &str,
        notification_type: &str,
        title: &str,
        message: &str,
        link: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let row = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            notification_type: notification_type.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            link: link.map(str::to_string),
            metadata,
            created_at: Utc::now(),
        };
        self.store.push_notification(&row)?;
        Ok(())
    }
}

/// Store-backed activity log.
pub struct StoreActivityLog {
    store: Arc<Store>,
}

impl StoreActivityLog {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ActivityLog for StoreActivityLog {
    async fn record(
        &self,
        user_id: &str,
        agent: &str,
        activity_type: &str,
        title: &str,
        description: &str,
        confidence: f32,
        metadata: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let row = ActivityEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            agent: agent.to_string(),
            activity_type: activity_type.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            metadata,
            created_at: Utc::now(),
        };
        self.store.push_activity(&row)?;
        Ok(())
    }
}
