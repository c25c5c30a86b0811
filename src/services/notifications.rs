use sqlx::PgPool;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::types::NotificationType;
use crate::repositories;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewNotification {
    pub(crate) notification_type: NotificationType,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) link: Option<String>,
}

impl NewNotification {
    pub(crate) fn enrollment_approved(course_title: &str) -> Self {
        Self {
            notification_type: NotificationType::Success,
            title: "Enrollment Approved".to_string(),
            message: format!("Your enrollment for {course_title} has been approved!"),
            link: Some("/my-courses".to_string()),
        }
    }

    pub(crate) fn enrollment_rejected(course_title: &str, reason: &str) -> Self {
        Self {
            notification_type: NotificationType::Error,
            title: "Enrollment Rejected".to_string(),
            message: format!("Enrollment for {course_title} rejected. Reason: {reason}"),
            link: Some("/my-courses".to_string()),
        }
    }

    pub(crate) fn level_up(level: i32, tokens: i32) -> Self {
        let noun = if tokens == 1 { "Token" } else { "Tokens" };
        Self {
            notification_type: NotificationType::Success,
            title: "Level Up!".to_string(),
            message: format!("You reached Level {level} and earned {tokens} {noun}!"),
            link: Some("/profile".to_string()),
        }
    }

    pub(crate) fn new_follower(username: &str) -> Self {
        Self {
            notification_type: NotificationType::Info,
            title: "New Follower".to_string(),
            message: format!("{username} started following you!"),
            link: Some("/profile".to_string()),
        }
    }

    pub(crate) fn friend_request(username: &str) -> Self {
        Self {
            notification_type: NotificationType::Info,
            title: "New Friend Request".to_string(),
            message: format!("{username} sent you a friend request"),
            link: Some("/profile".to_string()),
        }
    }

    pub(crate) fn friend_request_accepted(username: &str, user_id: &str) -> Self {
        Self {
            notification_type: NotificationType::Success,
            title: "Friend Request Accepted".to_string(),
            message: format!("{username} accepted your friend request!"),
            link: Some(format!("/users/{user_id}")),
        }
    }

    pub(crate) fn course_completed(course_title: &str, xp: i64) -> Self {
        Self {
            notification_type: NotificationType::Success,
            title: "Course Completed!".to_string(),
            message: format!("Congratulations! You completed {course_title} and earned {xp} XP."),
            link: Some("/my-courses".to_string()),
        }
    }
}

/// Persists a notification after the triggering write has committed. Failures are
/// logged and counted but never propagate to the caller.
pub(crate) async fn notify(pool: &PgPool, user_id: &str, notification: NewNotification) {
    let id = Uuid::new_v4().to_string();
    let result = repositories::notifications::create(
        pool,
        repositories::notifications::CreateNotification {
            id: &id,
            user_id,
            notification_type: notification.notification_type,
            title: &notification.title,
            message: &notification.message,
            link: notification.link.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await;

    if let Err(err) = result {
        metrics::side_effect_failed("notification");
        tracing::warn!(
            error = %err,
            user_id,
            title = %notification.title,
            "Failed to create notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_up_message_pluralizes_tokens() {
        assert_eq!(
            NewNotification::level_up(3, 1).message,
            "You reached Level 3 and earned 1 Token!"
        );
        assert_eq!(
            NewNotification::level_up(5, 2).message,
            "You reached Level 5 and earned 2 Tokens!"
        );
    }

    #[test]
    fn review_notifications_carry_course_title() {
        let approved = NewNotification::enrollment_approved("Maya 101");
        assert_eq!(approved.notification_type, NotificationType::Success);
        assert_eq!(approved.message, "Your enrollment for Maya 101 has been approved!");

        let rejected = NewNotification::enrollment_rejected("Maya 101", "Payment verification failed");
        assert_eq!(rejected.notification_type, NotificationType::Error);
        assert_eq!(
            rejected.message,
            "Enrollment for Maya 101 rejected. Reason: Payment verification failed"
        );
    }

    #[test]
    fn friend_acceptance_links_to_accepting_user() {
        let note = NewNotification::friend_request_accepted("maya", "user-9");
        assert_eq!(note.message, "maya accepted your friend request!");
        assert_eq!(note.link.as_deref(), Some("/users/user-9"));
    }

    #[test]
    fn course_completion_mentions_xp() {
        let note = NewNotification::course_completed("Rigging", 250);
        assert_eq!(note.title, "Course Completed!");
        assert_eq!(note.message, "Congratulations! You completed Rigging and earned 250 XP.");
    }
}
