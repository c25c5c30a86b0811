use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;

const SUPERUSER_USERNAME: &str = "admin";

pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let email = admin.first_superuser_email.trim().to_lowercase();
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_email(state.db(), &email).await? {
        let update = reconcile(&user, &admin.first_superuser_password)?;
        if update.hashed_password.is_none() && update.role.is_none() && update.is_active.is_none()
        {
            tracing::info!("Default superuser already up to date");
            return Ok(());
        }

        repositories::users::update_account(
            state.db(),
            &user.id,
            repositories::users::UpdateAccount { updated_at: now, ..update },
        )
        .await?;
        tracing::info!(email = %email, "Updated default superuser");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: SUPERUSER_USERNAME,
            email: &email,
            hashed_password,
            role: UserRole::Admin,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!(email = %email, "Created default superuser");
    Ok(())
}

/// Only the fields that drifted from the configured superuser are set.
fn reconcile(
    user: &User,
    password: &str,
) -> Result<repositories::users::UpdateAccount, security::SecurityError> {
    let verified = security::verify_password(password, &user.hashed_password).unwrap_or(false);
    let hashed_password = if verified { None } else { Some(security::hash_password(password)?) };

    Ok(repositories::users::UpdateAccount {
        hashed_password,
        role: (user.role != UserRole::Admin).then_some(UserRole::Admin),
        is_active: (!user.is_active).then_some(true),
        updated_at: user.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, is_active: bool, password: &str) -> User {
        let now = primitive_now_utc();
        User {
            id: "user-1".to_string(),
            username: "admin".to_string(),
            email: "admin@nexus4d.com".to_string(),
            hashed_password: security::hash_password(password).expect("hash"),
            role,
            xp_points: 0,
            level: 1,
            avatar_unlock_tokens: 0,
            current_avatar_url: None,
            is_active,
            first_name: None,
            last_name: None,
            major: None,
            semester: None,
            bio: None,
            show_nexons: true,
            show_courses: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reconcile_is_empty_when_account_matches() {
        let update = reconcile(&user(UserRole::Admin, true, "secret-pass"), "secret-pass")
            .expect("reconcile");
        assert!(update.hashed_password.is_none());
        assert!(update.role.is_none());
        assert!(update.is_active.is_none());
    }

    #[test]
    fn reconcile_restores_role_password_and_activation() {
        let update = reconcile(&user(UserRole::Student, false, "old-pass"), "new-pass")
            .expect("reconcile");
        let hashed = update.hashed_password.expect("new hash");
        assert!(security::verify_password("new-pass", &hashed).expect("verify"));
        assert_eq!(update.role, Some(UserRole::Admin));
        assert_eq!(update.is_active, Some(true));
    }
}
