use std::collections::HashSet;

use sqlx::PgPool;
use thiserror::Error;

use crate::core::time::primitive_now_utc;
use crate::db::models::Enrollment;
use crate::db::types::{EnrollmentStatus, PackageTier};
use crate::repositories;
use crate::services::access::{self, ChapterContent};

#[derive(Debug, Error)]
pub(crate) enum ProgressError {
    #[error("Enrollment not found")]
    EnrollmentNotFound,
    #[error("Material not found")]
    MaterialNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProgressSnapshot {
    pub(crate) progress: i32,
    pub(crate) completed_chapter_ids: Vec<String>,
    pub(crate) total_accessible: usize,
    pub(crate) completed_accessible: usize,
}

/// Recomputes progress from scratch over every chapter of the course, counting only
/// the materials `tier` can see.
pub(crate) fn compute(
    content: &[ChapterContent],
    tier: PackageTier,
    completed_material_ids: &[String],
) -> ProgressSnapshot {
    let completed: HashSet<&str> = completed_material_ids.iter().map(String::as_str).collect();

    let mut total_accessible = 0usize;
    let mut completed_accessible = 0usize;
    let mut completed_chapter_ids = Vec::new();

    for entry in content {
        let visible = access::materials_visible_to(&entry.materials, tier);
        let done = visible.iter().filter(|material| completed.contains(material.id.as_str())).count();

        total_accessible += visible.len();
        completed_accessible += done;

        if !visible.is_empty() && done == visible.len() {
            completed_chapter_ids.push(entry.chapter.id.clone());
        }
    }

    let progress = if total_accessible == 0 {
        0
    } else {
        (100.0 * completed_accessible as f64 / total_accessible as f64).round() as i32
    };

    ProgressSnapshot { progress, completed_chapter_ids, total_accessible, completed_accessible }
}

/// `active <-> completed` follows progress; every other status is left alone.
pub(crate) fn next_status(current: EnrollmentStatus, progress: i32) -> EnrollmentStatus {
    match current {
        EnrollmentStatus::Active if progress >= 100 => EnrollmentStatus::Completed,
        EnrollmentStatus::Completed if progress < 100 => EnrollmentStatus::Active,
        other => other,
    }
}

/// Flips membership of `material_id`. Returns whether the material is now completed.
pub(crate) fn toggle_membership(ids: &mut Vec<String>, material_id: &str) -> bool {
    if let Some(index) = ids.iter().position(|id| id == material_id) {
        ids.remove(index);
        false
    } else {
        ids.push(material_id.to_string());
        true
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ToggleOutcome {
    pub(crate) completed: bool,
    pub(crate) enrollment: Enrollment,
}

pub(crate) async fn load_content(
    pool: &PgPool,
    course_id: &str,
) -> Result<Vec<ChapterContent>, sqlx::Error> {
    let chapters = repositories::chapters::list_for_course(pool, course_id).await?;
    let materials = repositories::materials::list_for_course(pool, course_id).await?;
    Ok(access::group_by_chapter(chapters, materials))
}

pub(crate) async fn toggle_material(
    pool: &PgPool,
    user_id: &str,
    course_id: &str,
    material_id: &str,
) -> Result<ToggleOutcome, ProgressError> {
    let mut tx = pool.begin().await?;

    let mut enrollment =
        repositories::enrollments::lock_by_user_course(&mut tx, user_id, course_id)
            .await?
            .ok_or(ProgressError::EnrollmentNotFound)?;

    if repositories::materials::find_in_course(&mut *tx, course_id, material_id).await?.is_none()
    {
        return Err(ProgressError::MaterialNotFound);
    }

    let chapters = repositories::chapters::list_for_course(&mut *tx, course_id).await?;
    let materials = repositories::materials::list_for_course(&mut *tx, course_id).await?;
    let content = access::group_by_chapter(chapters, materials);

    let completed = toggle_membership(&mut enrollment.completed_material_ids, material_id);
    let snapshot = compute(&content, enrollment.package, &enrollment.completed_material_ids);
    let status = next_status(enrollment.status, snapshot.progress);

    let updated = repositories::enrollments::save_progress(
        &mut tx,
        &enrollment.id,
        repositories::enrollments::SaveProgress {
            completed_material_ids: &enrollment.completed_material_ids,
            completed_chapter_ids: &snapshot.completed_chapter_ids,
            progress: snapshot.progress,
            status,
            now: primitive_now_utc(),
        },
    )
    .await?;

    if status != enrollment.status {
        repositories::courses::refresh_enrolled_students(&mut tx, course_id).await?;
    }

    tx.commit().await?;

    tracing::info!(
        enrollment_id = %updated.id,
        material_id,
        completed,
        progress = updated.progress,
        status = updated.status.as_str(),
        "Material completion toggled"
    );

    Ok(ToggleOutcome { completed, enrollment: updated })
}

/// Re-derives progress for every enrollment of a course after its chapters or
/// materials changed. Returns the number of enrollments whose state moved.
pub(crate) async fn recompute_course(pool: &PgPool, course_id: &str) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let enrollments = repositories::enrollments::lock_all_for_course(&mut tx, course_id).await?;
    if enrollments.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    let chapters = repositories::chapters::list_for_course(&mut *tx, course_id).await?;
    let materials = repositories::materials::list_for_course(&mut *tx, course_id).await?;
    let content = access::group_by_chapter(chapters, materials);
    let now = primitive_now_utc();

    let mut changed = 0usize;
    for enrollment in enrollments {
        let snapshot = compute(&content, enrollment.package, &enrollment.completed_material_ids);
        let status = next_status(enrollment.status, snapshot.progress);

        if snapshot.progress == enrollment.progress
            && snapshot.completed_chapter_ids == enrollment.completed_chapter_ids
            && status == enrollment.status
        {
            continue;
        }

        repositories::enrollments::save_progress(
            &mut tx,
            &enrollment.id,
            repositories::enrollments::SaveProgress {
                completed_material_ids: &enrollment.completed_material_ids,
                completed_chapter_ids: &snapshot.completed_chapter_ids,
                progress: snapshot.progress,
                status,
                now,
            },
        )
        .await?;
        changed += 1;
    }

    repositories::courses::refresh_enrolled_students(&mut tx, course_id).await?;
    tx.commit().await?;

    tracing::info!(course_id, changed, "Course progress recomputed");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::access::fixtures::{chapter, material};
    use crate::services::access::group_by_chapter;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn tiered_course() -> Vec<ChapterContent> {
        group_by_chapter(
            vec![chapter("c1", 1), chapter("c2", 2)],
            vec![
                material("b1", "c1", PackageTier::Basic),
                material("a1", "c1", PackageTier::Advanced),
                material("p1", "c1", PackageTier::Premium),
                material("b2", "c2", PackageTier::Basic),
            ],
        )
    }

    #[test]
    fn basic_tier_ignores_higher_materials() {
        let snapshot = compute(&tiered_course(), PackageTier::Basic, &ids(&["b1", "b2"]));
        assert_eq!(snapshot.total_accessible, 2);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.completed_chapter_ids, ids(&["c1", "c2"]));
    }

    #[test]
    fn premium_tier_counts_everything() {
        let snapshot = compute(&tiered_course(), PackageTier::Premium, &ids(&["b1", "b2"]));
        assert_eq!(snapshot.total_accessible, 4);
        assert_eq!(snapshot.progress, 50);
        assert_eq!(snapshot.completed_chapter_ids, ids(&["c2"]));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let content = group_by_chapter(
            vec![chapter("c1", 1)],
            vec![
                material("m1", "c1", PackageTier::Basic),
                material("m2", "c1", PackageTier::Basic),
                material("m3", "c1", PackageTier::Basic),
                material("m4", "c1", PackageTier::Basic),
                material("m5", "c1", PackageTier::Basic),
                material("m6", "c1", PackageTier::Basic),
                material("m7", "c1", PackageTier::Basic),
                material("m8", "c1", PackageTier::Basic),
            ],
        );
        // 1/8 = 12.5%
        let snapshot = compute(&content, PackageTier::Basic, &ids(&["m1"]));
        assert_eq!(snapshot.progress, 13);

        // 2/3 = 66.67%
        let thirds = group_by_chapter(
            vec![chapter("c1", 1)],
            vec![
                material("m1", "c1", PackageTier::Basic),
                material("m2", "c1", PackageTier::Basic),
                material("m3", "c1", PackageTier::Basic),
            ],
        );
        assert_eq!(compute(&thirds, PackageTier::Basic, &ids(&["m1", "m2"])).progress, 67);
    }

    #[test]
    fn empty_course_is_zero_percent() {
        let content = group_by_chapter(vec![chapter("c1", 1)], Vec::new());
        let snapshot = compute(&content, PackageTier::Premium, &[]);
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.completed_chapter_ids.is_empty());
    }

    #[test]
    fn chapter_without_visible_materials_is_never_complete() {
        let content = group_by_chapter(
            vec![chapter("c1", 1), chapter("c2", 2)],
            vec![
                material("b1", "c1", PackageTier::Basic),
                material("p1", "c2", PackageTier::Premium),
            ],
        );
        let snapshot = compute(&content, PackageTier::Basic, &ids(&["b1"]));
        assert_eq!(snapshot.completed_chapter_ids, ids(&["c1"]));
        assert_eq!(snapshot.progress, 100);
    }

    #[test]
    fn stale_ids_do_not_count() {
        let snapshot = compute(&tiered_course(), PackageTier::Basic, &ids(&["b1", "deleted"]));
        assert_eq!(snapshot.completed_accessible, 1);
        assert_eq!(snapshot.progress, 50);
    }

    #[test]
    fn toggle_on_then_off_restores_progress() {
        let content = tiered_course();
        let mut completed = ids(&["b1"]);
        let before = compute(&content, PackageTier::Basic, &completed).progress;

        assert!(toggle_membership(&mut completed, "b2"));
        assert_eq!(compute(&content, PackageTier::Basic, &completed).progress, 100);

        assert!(!toggle_membership(&mut completed, "b2"));
        assert_eq!(compute(&content, PackageTier::Basic, &completed).progress, before);
    }

    #[test]
    fn status_follows_progress_only_between_active_and_completed() {
        assert_eq!(next_status(EnrollmentStatus::Active, 100), EnrollmentStatus::Completed);
        assert_eq!(next_status(EnrollmentStatus::Completed, 99), EnrollmentStatus::Active);
        assert_eq!(next_status(EnrollmentStatus::Active, 40), EnrollmentStatus::Active);
        assert_eq!(next_status(EnrollmentStatus::Pending, 100), EnrollmentStatus::Pending);
        assert_eq!(next_status(EnrollmentStatus::Rejected, 100), EnrollmentStatus::Rejected);
    }
}
