use sqlx::{Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Course, Enrollment, PromoCode, User};
use crate::db::types::{EnrollmentStatus, PackageTier};
use crate::repositories;
use crate::services::access::{self, ChapterContent};
use crate::services::email;
use crate::services::notifications::{self, NewNotification};
use crate::services::progress;
use crate::services::promo::{self, Discount};
use crate::services::storage;

/// Receipt marker stored when the final price is zero and no file is needed.
pub(crate) const FREE_RECEIPT_MARKER: &str = "COUPON_FREE";
pub(crate) const DEFAULT_REJECTION_REASON: &str = "Payment verification failed";
const RECEIPT_FOLDER: &str = "receipts";

#[derive(Debug, Error)]
pub(crate) enum EnrollError {
    #[error("Course not found")]
    CourseNotFound,
    #[error("{0}")]
    InvalidPackage(String),
    #[error("Payment receipt is required")]
    ReceiptRequired,
    #[error("You are already active on the {} package.", .0.as_str())]
    AlreadyEnrolled(PackageTier),
    #[error("Enrollment not found")]
    EnrollmentNotFound,
    #[error("Enrollment is not pending review")]
    NotPending,
    #[error("Receipt storage is not configured")]
    StorageUnavailable,
    #[error("Receipt upload failed: {0}")]
    Storage(anyhow::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnrollmentAction {
    Create,
    Renew,
    AlreadyEnrolled,
}

/// A rejected or pending enrollment can always be resubmitted; an active or completed
/// one only when switching to another package.
pub(crate) fn decide(
    existing: Option<(EnrollmentStatus, PackageTier)>,
    requested: PackageTier,
) -> EnrollmentAction {
    match existing {
        None => EnrollmentAction::Create,
        Some((EnrollmentStatus::Rejected | EnrollmentStatus::Pending, _)) => EnrollmentAction::Renew,
        Some((_, current)) if current != requested => EnrollmentAction::Renew,
        Some(_) => EnrollmentAction::AlreadyEnrolled,
    }
}

pub(crate) fn initial_status(final_price: f64) -> EnrollmentStatus {
    if final_price <= 0.0 {
        EnrollmentStatus::Active
    } else {
        EnrollmentStatus::Pending
    }
}

/// An absent or blank package means `basic`.
pub(crate) fn resolve_tier(raw: Option<&str>) -> Result<PackageTier, EnrollError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(PackageTier::default()),
        Some(value) => value.parse().map_err(EnrollError::InvalidPackage),
    }
}

#[derive(Debug)]
pub(crate) struct ReceiptUpload {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

pub(crate) struct EnrollRequest<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) package: Option<&'a str>,
    pub(crate) promo_code: Option<&'a str>,
    pub(crate) receipt: Option<ReceiptUpload>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnrollOutcome {
    pub(crate) enrollment: Enrollment,
    pub(crate) created: bool,
    pub(crate) discount: Discount,
    pub(crate) promo_applied: bool,
}

struct Pricing {
    discount: Discount,
    promo: Option<PromoCode>,
}

fn price_with_promo(
    course: &Course,
    tier: PackageTier,
    promo: Option<PromoCode>,
    requested_code: Option<&str>,
) -> Pricing {
    let base_price = course.package_price(tier);
    let full_price = Discount { base_price, discount_amount: 0.0, final_price: base_price };

    let Some(code) = requested_code else {
        return Pricing { discount: full_price, promo: None };
    };

    match promo::evaluate(promo.as_ref(), &course.id, tier, base_price, primitive_now_utc()) {
        Ok(discount) => Pricing { discount, promo },
        Err(rejection) => {
            tracing::info!(
                course_id = %course.id,
                code,
                reason = rejection.reason(),
                "Promo code ignored at enrollment"
            );
            Pricing { discount: full_price, promo: None }
        }
    }
}

pub(crate) async fn enroll(
    state: &AppState,
    request: EnrollRequest<'_>,
) -> Result<EnrollOutcome, EnrollError> {
    let course = repositories::courses::find_by_id(state.db(), request.course_id)
        .await?
        .ok_or(EnrollError::CourseNotFound)?;
    let tier = resolve_tier(request.package)?;

    let code = request.promo_code.map(promo::normalize_code).filter(|code| !code.is_empty());

    // Unlocked read to decide whether the receipt must be stored. The locked
    // re-evaluation inside the transaction is authoritative.
    let preview_promo = match code.as_deref() {
        Some(code) => repositories::promo_codes::find_by_code(state.db(), code).await?,
        None => None,
    };
    let preview = price_with_promo(&course, tier, preview_promo, code.as_deref());
    if preview.discount.final_price > 0.0 && request.receipt.is_none() {
        return Err(EnrollError::ReceiptRequired);
    }

    let uploaded_receipt = match (preview.discount.final_price > 0.0, request.receipt) {
        (true, Some(receipt)) => Some(store_receipt(state, receipt).await?),
        _ => None,
    };

    let receipt = uploaded_receipt.as_deref();
    let code = code.as_deref();
    let attempt = match enroll_once(state, &course, tier, code, request.user_id, receipt).await {
        // Lost the insert race; the retry sees the other request's row.
        Ok(None) => enroll_once(state, &course, tier, code, request.user_id, receipt).await,
        other => other,
    };

    let (result, previous_receipt) = match attempt {
        Ok(Some(done)) => done,
        Ok(None) => {
            if let Some(url) = receipt {
                discard_receipt(state, url).await;
            }
            return Err(EnrollError::Database(sqlx::Error::RowNotFound));
        }
        Err(err) => {
            if let Some(url) = receipt {
                discard_receipt(state, url).await;
            }
            return Err(err);
        }
    };

    if let (Some(uploaded), Some(stored)) =
        (uploaded_receipt.as_deref(), result.enrollment.receipt_url.as_deref())
    {
        if uploaded != stored {
            discard_receipt(state, uploaded).await;
        }
    }
    if let Some(previous) = previous_receipt {
        if Some(previous.as_str()) != result.enrollment.receipt_url.as_deref() {
            discard_receipt(state, &previous).await;
        }
    }

    metrics::enrollment_created(result.enrollment.status.as_str());
    if result.promo_applied {
        metrics::promo_code_applied();
    }

    tracing::info!(
        enrollment_id = %result.enrollment.id,
        user_id = request.user_id,
        course_id = %course.id,
        package = tier.as_str(),
        status = result.enrollment.status.as_str(),
        amount_paid = result.enrollment.amount_paid,
        created = result.created,
        "Enrollment submitted"
    );

    Ok(result)
}

/// One transactional attempt. `Ok(None)` means the insert lost a race with a
/// concurrent request for the same (user, course).
async fn enroll_once(
    state: &AppState,
    course: &Course,
    tier: PackageTier,
    code: Option<&str>,
    user_id: &str,
    uploaded_receipt: Option<&str>,
) -> Result<Option<(EnrollOutcome, Option<String>)>, EnrollError> {
    let mut tx = state.db().begin().await?;

    let existing =
        repositories::enrollments::lock_by_user_course(&mut tx, user_id, &course.id).await?;
    let action = decide(existing.as_ref().map(|item| (item.status, item.package)), tier);
    if action == EnrollmentAction::AlreadyEnrolled {
        return Err(EnrollError::AlreadyEnrolled(tier));
    }

    let locked_promo = match code {
        Some(code) => repositories::promo_codes::lock_by_code(&mut tx, code).await?,
        None => None,
    };
    let pricing = price_with_promo(course, tier, locked_promo, code);
    let final_price = pricing.discount.final_price;

    let receipt_url = if final_price > 0.0 {
        uploaded_receipt.ok_or(EnrollError::ReceiptRequired)?.to_string()
    } else {
        FREE_RECEIPT_MARKER.to_string()
    };

    let status = initial_status(final_price);
    let promo_code = pricing.promo.as_ref().map(|promo| promo.code.as_str());
    let promo_code_id = pricing.promo.as_ref().map(|promo| promo.id.as_str());
    let now = primitive_now_utc();

    let (enrollment, created, previous_status, previous_receipt) = match existing {
        None => {
            let id = Uuid::new_v4().to_string();
            let inserted = repositories::enrollments::insert(
                &mut tx,
                repositories::enrollments::CreateEnrollment {
                    id: &id,
                    user_id,
                    course_id: &course.id,
                    package: tier,
                    status,
                    amount_paid: final_price,
                    receipt_url: &receipt_url,
                    promo_code,
                    promo_code_id,
                    now,
                },
            )
            .await?;

            let Some(enrollment) = inserted else {
                tx.rollback().await?;
                return Ok(None);
            };
            (enrollment, true, None, None)
        }
        Some(current) => {
            let content = load_content_in_tx(&mut tx, &course.id).await?;
            let snapshot = progress::compute(&content, tier, &current.completed_material_ids);
            let renewed_status = progress::next_status(status, snapshot.progress);

            let enrollment = repositories::enrollments::renew(
                &mut tx,
                &current.id,
                repositories::enrollments::RenewEnrollment {
                    package: tier,
                    status: renewed_status,
                    amount_paid: final_price,
                    receipt_url: &receipt_url,
                    promo_code,
                    promo_code_id,
                    progress: snapshot.progress,
                    completed_chapter_ids: &snapshot.completed_chapter_ids,
                    now,
                },
            )
            .await?;
            (enrollment, false, Some(current.status), current.receipt_url)
        }
    };

    if let Some(promo) = pricing.promo.as_ref() {
        repositories::promo_codes::increment_usage(&mut tx, &promo.id, now).await?;
    }

    if enrollment.status.grants_access() || previous_status.is_some_and(|prev| prev.grants_access())
    {
        repositories::courses::refresh_enrolled_students(&mut tx, &course.id).await?;
    }

    tx.commit().await?;

    let outcome = EnrollOutcome {
        enrollment,
        created,
        discount: pricing.discount,
        promo_applied: pricing.promo.is_some(),
    };
    Ok(Some((outcome, previous_receipt)))
}

async fn load_content_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    course_id: &str,
) -> Result<Vec<ChapterContent>, sqlx::Error> {
    let chapters = repositories::chapters::list_for_course(&mut **tx, course_id).await?;
    let materials = repositories::materials::list_for_course(&mut **tx, course_id).await?;
    Ok(access::group_by_chapter(chapters, materials))
}

async fn store_receipt(state: &AppState, receipt: ReceiptUpload) -> Result<String, EnrollError> {
    let storage = state.storage().ok_or(EnrollError::StorageUnavailable)?;
    storage
        .upload(RECEIPT_FOLDER, &receipt.filename, &receipt.content_type, receipt.bytes)
        .await
        .map_err(EnrollError::Storage)
}

async fn discard_receipt(state: &AppState, url: &str) {
    storage::discard(state.storage(), url).await;
}

pub(crate) async fn approve(state: &AppState, enrollment_id: &str) -> Result<Enrollment, EnrollError> {
    let enrollment = review(state, enrollment_id, EnrollmentStatus::Active, None).await?;

    if let Some((user, course)) = load_parties(state, &enrollment).await {
        notifications::notify(
            state.db(),
            &user.id,
            NewNotification::enrollment_approved(&course.title),
        )
        .await;
        email::dispatch(
            state.mailer().cloned(),
            user.email.clone(),
            email::enrollment_approved(
                &user.username,
                &course.title,
                &state.settings().api().client_base_url,
            ),
        );
    }

    tracing::info!(enrollment_id, status = enrollment.status.as_str(), "Enrollment approved");
    Ok(enrollment)
}

pub(crate) async fn reject(
    state: &AppState,
    enrollment_id: &str,
    reason: Option<&str>,
) -> Result<Enrollment, EnrollError> {
    let reason = reason
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_REJECTION_REASON);

    let enrollment = review(state, enrollment_id, EnrollmentStatus::Rejected, Some(reason)).await?;

    if let Some((user, course)) = load_parties(state, &enrollment).await {
        notifications::notify(
            state.db(),
            &user.id,
            NewNotification::enrollment_rejected(&course.title, reason),
        )
        .await;
        email::dispatch(
            state.mailer().cloned(),
            user.email.clone(),
            email::enrollment_rejected(
                &user.username,
                &course.title,
                reason,
                &state.settings().api().client_base_url,
            ),
        );
    }

    tracing::info!(enrollment_id, reason, "Enrollment rejected");
    Ok(enrollment)
}

async fn review(
    state: &AppState,
    enrollment_id: &str,
    status: EnrollmentStatus,
    reason: Option<&str>,
) -> Result<Enrollment, EnrollError> {
    let mut tx = state.db().begin().await?;

    let Some(enrollment) = repositories::enrollments::set_review_outcome(
        &mut tx,
        enrollment_id,
        status,
        reason,
        primitive_now_utc(),
    )
    .await?
    else {
        let exists = repositories::enrollments::lock_by_id(&mut tx, enrollment_id).await?;
        return Err(match exists {
            Some(_) => EnrollError::NotPending,
            None => EnrollError::EnrollmentNotFound,
        });
    };

    repositories::courses::refresh_enrolled_students(&mut tx, &enrollment.course_id).await?;
    tx.commit().await?;
    Ok(enrollment)
}

async fn load_parties(
    state: &AppState,
    enrollment: &Enrollment,
) -> Option<(User, Course)> {
    let user = repositories::users::find_by_id(state.db(), &enrollment.user_id).await;
    let course = repositories::courses::find_by_id(state.db(), &enrollment.course_id).await;

    match (user, course) {
        (Ok(Some(user)), Ok(Some(course))) => Some((user, course)),
        (user, course) => {
            metrics::side_effect_failed("notification");
            tracing::warn!(
                enrollment_id = %enrollment.id,
                user_found = matches!(user, Ok(Some(_))),
                course_found = matches!(course, Ok(Some(_))),
                "Skipping review notifications"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_enrollment_is_created() {
        assert_eq!(decide(None, PackageTier::Basic), EnrollmentAction::Create);
    }

    #[test]
    fn rejected_and_pending_can_resubmit_any_tier() {
        for status in [EnrollmentStatus::Rejected, EnrollmentStatus::Pending] {
            assert_eq!(
                decide(Some((status, PackageTier::Basic)), PackageTier::Basic),
                EnrollmentAction::Renew
            );
            assert_eq!(
                decide(Some((status, PackageTier::Basic)), PackageTier::Premium),
                EnrollmentAction::Renew
            );
        }
    }

    #[test]
    fn active_enrollment_only_renews_on_tier_change() {
        for status in [EnrollmentStatus::Active, EnrollmentStatus::Completed] {
            assert_eq!(
                decide(Some((status, PackageTier::Advanced)), PackageTier::Advanced),
                EnrollmentAction::AlreadyEnrolled
            );
            assert_eq!(
                decide(Some((status, PackageTier::Advanced)), PackageTier::Premium),
                EnrollmentAction::Renew
            );
            assert_eq!(
                decide(Some((status, PackageTier::Advanced)), PackageTier::Basic),
                EnrollmentAction::Renew
            );
        }
    }

    #[test]
    fn free_enrollments_skip_review() {
        assert_eq!(initial_status(0.0), EnrollmentStatus::Active);
        assert_eq!(initial_status(49.99), EnrollmentStatus::Pending);
    }

    #[test]
    fn package_defaults_to_basic() {
        assert_eq!(resolve_tier(None).ok(), Some(PackageTier::Basic));
        assert_eq!(resolve_tier(Some("  ")).ok(), Some(PackageTier::Basic));
        assert_eq!(resolve_tier(Some("premium")).ok(), Some(PackageTier::Premium));
    }

    #[test]
    fn unknown_package_is_rejected() {
        let err = resolve_tier(Some("platinum")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid package type: platinum");
    }

    #[test]
    fn already_enrolled_message_names_package() {
        let err = EnrollError::AlreadyEnrolled(PackageTier::Advanced);
        assert_eq!(err.to_string(), "You are already active on the advanced package.");
    }
}
