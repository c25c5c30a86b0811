use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Avatar, Enrollment};
use crate::repositories;
use crate::services::leveling::{self, LevelOutcome, Progression};
use crate::services::notifications::{self, NewNotification};

#[derive(Debug, Error)]
pub(crate) enum ClaimError {
    #[error("Enrollment not found")]
    EnrollmentNotFound,
    #[error("Chapter not found")]
    ChapterNotFound,
    #[error("{0}")]
    NotCompleted(&'static str),
    #[error("{0}")]
    AlreadyClaimed(&'static str),
    #[error("User not found")]
    UserNotFound,
    #[error("Course not found")]
    CourseNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct ChapterClaim {
    pub(crate) claimed_xp: i64,
    pub(crate) level: LevelOutcome,
}

#[derive(Debug, Clone)]
pub(crate) struct CourseClaim {
    pub(crate) claimed_xp: i64,
    pub(crate) level: LevelOutcome,
    pub(crate) reward_avatar: Option<Avatar>,
}

pub(crate) fn check_chapter_claim(enrollment: &Enrollment, chapter_id: &str) -> Result<(), ClaimError> {
    if !enrollment.completed_chapter_ids.iter().any(|id| id == chapter_id) {
        return Err(ClaimError::NotCompleted("Chapter not completed yet"));
    }
    if enrollment.claimed_chapter_ids.iter().any(|id| id == chapter_id) {
        return Err(ClaimError::AlreadyClaimed("Reward already claimed"));
    }
    Ok(())
}

pub(crate) fn check_course_claim(enrollment: &Enrollment) -> Result<(), ClaimError> {
    if enrollment.progress < 100 {
        return Err(ClaimError::NotCompleted("Course not 100% completed"));
    }
    if enrollment.is_course_reward_claimed {
        return Err(ClaimError::AlreadyClaimed("Rewards already claimed"));
    }
    Ok(())
}

pub(crate) async fn claim_chapter(
    state: &AppState,
    user_id: &str,
    course_id: &str,
    chapter_id: &str,
) -> Result<ChapterClaim, ClaimError> {
    let chapter = repositories::chapters::find_in_course(state.db(), course_id, chapter_id)
        .await?
        .ok_or(ClaimError::ChapterNotFound)?;

    let mut tx = state.db().begin().await?;
    let enrollment = repositories::enrollments::lock_by_user_course(&mut tx, user_id, course_id)
        .await?
        .ok_or(ClaimError::EnrollmentNotFound)?;
    check_chapter_claim(&enrollment, chapter_id)?;

    let now = primitive_now_utc();
    if repositories::enrollments::claim_chapter(&mut tx, &enrollment.id, chapter_id, now)
        .await?
        .is_none()
    {
        return Err(ClaimError::AlreadyClaimed("Reward already claimed"));
    }

    let level = grant_xp(state, &mut tx, user_id, chapter.xp_reward).await?;
    tx.commit().await?;

    metrics::reward_claimed("chapter");
    tracing::info!(
        user_id,
        course_id,
        chapter_id,
        xp = chapter.xp_reward,
        level = level.progression.level,
        "Chapter reward claimed"
    );

    if level.leveled_up() {
        notifications::notify(
            state.db(),
            user_id,
            NewNotification::level_up(level.progression.level, level.levels_gained),
        )
        .await;
    }

    Ok(ChapterClaim { claimed_xp: chapter.xp_reward, level })
}

pub(crate) async fn claim_course(
    state: &AppState,
    user_id: &str,
    course_id: &str,
) -> Result<CourseClaim, ClaimError> {
    let course = repositories::courses::find_by_id(state.db(), course_id)
        .await?
        .ok_or(ClaimError::CourseNotFound)?;

    let reward_avatar = match course.reward_avatar_id.as_deref() {
        Some(avatar_id) => {
            let avatar = repositories::avatars::find_by_id(state.db(), avatar_id).await?;
            if avatar.is_none() {
                tracing::warn!(course_id, avatar_id, "Course reward avatar no longer exists");
            }
            avatar
        }
        None => None,
    };

    let mut tx = state.db().begin().await?;
    let enrollment = repositories::enrollments::lock_by_user_course(&mut tx, user_id, course_id)
        .await?
        .ok_or(ClaimError::EnrollmentNotFound)?;
    check_course_claim(&enrollment)?;

    let now = primitive_now_utc();
    if repositories::enrollments::claim_course(&mut tx, &enrollment.id, now).await?.is_none() {
        return Err(ClaimError::AlreadyClaimed("Rewards already claimed"));
    }

    let level = grant_xp(state, &mut tx, user_id, course.completion_xp_bonus).await?;

    if let Some(avatar) = reward_avatar.as_ref() {
        let newly_unlocked = repositories::avatars::unlock(&mut tx, user_id, &avatar.id, now).await?;
        tracing::debug!(user_id, avatar_id = %avatar.id, newly_unlocked, "Reward avatar granted");
    }

    tx.commit().await?;

    metrics::reward_claimed("course");
    tracing::info!(
        user_id,
        course_id,
        xp = course.completion_xp_bonus,
        level = level.progression.level,
        "Course reward claimed"
    );

    notifications::notify(
        state.db(),
        user_id,
        NewNotification::course_completed(&course.title, course.completion_xp_bonus),
    )
    .await;
    if level.leveled_up() {
        notifications::notify(
            state.db(),
            user_id,
            NewNotification::level_up(level.progression.level, level.levels_gained),
        )
        .await;
    }

    Ok(CourseClaim { claimed_xp: course.completion_xp_bonus, level, reward_avatar })
}

async fn grant_xp(
    state: &AppState,
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    gain: i64,
) -> Result<LevelOutcome, ClaimError> {
    let user = repositories::users::lock_for_update(tx, user_id)
        .await?
        .ok_or(ClaimError::UserNotFound)?;

    let current = Progression {
        xp_points: user.xp_points,
        level: user.level,
        avatar_unlock_tokens: user.avatar_unlock_tokens,
    };
    let outcome =
        leveling::apply_xp_gain(current, gain, state.settings().gamification().xp_per_level);

    repositories::users::save_progression(tx, user_id, &outcome.progression, primitive_now_utc())
        .await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{EnrollmentStatus, PackageTier};

    fn enrollment(progress: i32, completed: &[&str], claimed: &[&str]) -> Enrollment {
        let now = primitive_now_utc();
        Enrollment {
            id: "enr-1".to_string(),
            user_id: "user-1".to_string(),
            course_id: "course-1".to_string(),
            package: PackageTier::Basic,
            status: EnrollmentStatus::Active,
            amount_paid: 0.0,
            progress,
            completed_material_ids: Vec::new(),
            completed_chapter_ids: completed.iter().map(|id| id.to_string()).collect(),
            claimed_chapter_ids: claimed.iter().map(|id| id.to_string()).collect(),
            is_course_reward_claimed: false,
            receipt_url: None,
            promo_code: None,
            promo_code_id: None,
            rejection_reason: None,
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn chapter_claim_requires_completion() {
        let err = check_chapter_claim(&enrollment(50, &["c2"], &[]), "c1").unwrap_err();
        assert!(matches!(err, ClaimError::NotCompleted(_)));
        assert_eq!(err.to_string(), "Chapter not completed yet");
    }

    #[test]
    fn chapter_claim_is_rejected_twice() {
        let item = enrollment(50, &["c1"], &[]);
        assert!(check_chapter_claim(&item, "c1").is_ok());

        let claimed = enrollment(50, &["c1"], &["c1"]);
        let err = check_chapter_claim(&claimed, "c1").unwrap_err();
        assert_eq!(err.to_string(), "Reward already claimed");
    }

    #[test]
    fn course_claim_needs_full_progress() {
        let err = check_course_claim(&enrollment(99, &[], &[])).unwrap_err();
        assert_eq!(err.to_string(), "Course not 100% completed");
        assert!(check_course_claim(&enrollment(100, &[], &[])).is_ok());
    }

    #[test]
    fn course_claim_only_once() {
        let mut item = enrollment(100, &[], &[]);
        item.is_course_reward_claimed = true;
        let err = check_course_claim(&item).unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyClaimed(_)));
    }
}
