use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Notification;
use crate::db::types::NotificationType;

const COLUMNS: &str = "id, user_id, notification_type, title, message, is_read, link, created_at";

pub(crate) struct CreateNotification<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) notification_type: NotificationType,
    pub(crate) title: &'a str,
    pub(crate) message: &'a str,
    pub(crate) link: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateNotification<'_>,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "INSERT INTO notifications (id, user_id, notification_type, title, message, link, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.notification_type)
    .bind(params.title)
    .bind(params.message)
    .bind(params.link)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_recent(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS} FROM notifications
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_unread(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!("SELECT {COLUMNS} FROM notifications WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn mark_read(pool: &PgPool, id: &str) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn mark_all_read(pool: &PgPool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
