//! Notifications REST service.

use std::sync::Arc;

use async_trait::async_trait;

use tourdesk_shared::models::{Notification, NotificationPage, NotificationPreferences};
use tourdesk_shared::protocol::{
    ApiResponse, CreateNotificationRequest, NotificationQuery, PushSubscription,
    TemplateNotificationRequest,
};
use tourdesk_shared::types::{NotificationId, UserId};

use crate::error::Result;
use crate::services::rest::{into_data, RestClient};

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn get_notifications(
        &self,
        user_id: &UserId,
        query: &NotificationQuery,
    ) -> Result<NotificationPage>;

    async fn create_notification(&self, request: CreateNotificationRequest)
        -> Result<Notification>;

    /// Instantiate the server-side template `template_id` with `request.params`.
    async fn create_from_template(
        &self,
        template_id: &str,
        request: TemplateNotificationRequest,
    ) -> Result<Notification>;

    async fn mark_as_read(&self, id: &NotificationId) -> Result<Notification>;

    async fn mark_all_as_read(&self, user_id: &UserId) -> Result<()>;

    async fn delete_notification(&self, id: &NotificationId) -> Result<()>;

    async fn clear_all(&self, user_id: &UserId) -> Result<()>;

    async fn get_user_preferences(&self, user_id: &UserId) -> Result<NotificationPreferences>;

    async fn update_user_preferences(
        &self,
        user_id: &UserId,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences>;

    async fn subscribe_push(&self, subscription: &PushSubscription) -> Result<()>;

    async fn unsubscribe_push(&self, subscription: &PushSubscription) -> Result<()>;
}

/// [`NotificationService`] over HTTP.
pub struct HttpNotificationService {
    rest: Arc<RestClient>,
}

impl HttpNotificationService {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    async fn get_notifications(
        &self,
        user_id: &UserId,
        query: &NotificationQuery,
    ) -> Result<NotificationPage> {
        let path = format!("notifications/user/{user_id}");
        let resp = self.rest.get_with_query(&path, query).await?;
        into_data(resp, "notification page")
    }

    async fn create_notification(
        &self,
        request: CreateNotificationRequest,
    ) -> Result<Notification> {
        let resp = self.rest.post("notifications", &request).await?;
        into_data(resp, "notification")
    }

    async fn create_from_template(
        &self,
        template_id: &str,
        request: TemplateNotificationRequest,
    ) -> Result<Notification> {
        let path = format!("notifications/templates/{template_id}");
        let resp = self.rest.post(&path, &request).await?;
        into_data(resp, "notification")
    }

    async fn mark_as_read(&self, id: &NotificationId) -> Result<Notification> {
        let path = format!("notifications/{id}/read");
        let resp = self.rest.put(&path, &serde_json::json!({})).await?;
        into_data(resp, "notification")
    }

    async fn mark_all_as_read(&self, user_id: &UserId) -> Result<()> {
        let path = format!("notifications/user/{user_id}/read-all");
        let _: ApiResponse<serde_json::Value> =
            self.rest.put(&path, &serde_json::json!({})).await?;
        Ok(())
    }

    async fn delete_notification(&self, id: &NotificationId) -> Result<()> {
        let path = format!("notifications/{id}");
        let _: ApiResponse<serde_json::Value> = self.rest.delete(&path).await?;
        Ok(())
    }

    async fn clear_all(&self, user_id: &UserId) -> Result<()> {
        let path = format!("notifications/user/{user_id}");
        let _: ApiResponse<serde_json::Value> = self.rest.delete(&path).await?;
        Ok(())
    }

    async fn get_user_preferences(&self, user_id: &UserId) -> Result<NotificationPreferences> {
        let path = format!("notifications/preferences/{user_id}");
        let resp = self.rest.get(&path).await?;
        into_data(resp, "preferences")
    }

    async fn update_user_preferences(
        &self,
        user_id: &UserId,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        let path = format!("notifications/preferences/{user_id}");
        let resp = self.rest.put(&path, prefs).await?;
        into_data(resp, "preferences")
    }

    async fn subscribe_push(&self, subscription: &PushSubscription) -> Result<()> {
        let _: ApiResponse<serde_json::Value> = self
            .rest
            .post("notifications/push/subscribe", subscription)
            .await?;
        Ok(())
    }

    async fn unsubscribe_push(&self, subscription: &PushSubscription) -> Result<()> {
        let _: ApiResponse<serde_json::Value> = self
            .rest
            .post("notifications/push/unsubscribe", subscription)
            .await?;
        Ok(())
    }
}
