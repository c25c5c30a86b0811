use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::Notification;
use crate::db::types::NotificationType;

#[derive(Debug, Serialize)]
pub(crate) struct NotificationResponse {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) notification_type: NotificationType,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) is_read: bool,
    pub(crate) link: Option<String>,
    pub(crate) created_at: String,
}

impl NotificationResponse {
    pub(crate) fn from_db(notification: Notification) -> Self {
        Self {
            id: notification.id,
            notification_type: notification.notification_type,
            title: notification.title,
            message: notification.message,
            is_read: notification.is_read,
            link: notification.link,
            created_at: format_primitive(notification.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NotificationListResponse {
    pub(crate) notifications: Vec<NotificationResponse>,
    pub(crate) unread_count: i64,
}
