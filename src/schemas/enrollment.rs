use serde::{Deserialize, Serialize};

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::models::Enrollment;
use crate::db::types::{CourseLevel, EnrollmentStatus, PackageTier};
use crate::repositories::enrollments::{AdminEnrollmentRow, EnrollmentWithCourse};
use crate::services::promo::Discount;

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) package: PackageTier,
    pub(crate) status: EnrollmentStatus,
    pub(crate) amount_paid: f64,
    pub(crate) progress: i32,
    pub(crate) completed_material_ids: Vec<String>,
    pub(crate) completed_chapter_ids: Vec<String>,
    pub(crate) claimed_chapter_ids: Vec<String>,
    pub(crate) is_course_reward_claimed: bool,
    pub(crate) receipt_url: Option<String>,
    pub(crate) promo_code: Option<String>,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) last_accessed_at: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            user_id: enrollment.user_id,
            course_id: enrollment.course_id,
            package: enrollment.package,
            status: enrollment.status,
            amount_paid: enrollment.amount_paid,
            progress: enrollment.progress,
            completed_material_ids: enrollment.completed_material_ids,
            completed_chapter_ids: enrollment.completed_chapter_ids,
            claimed_chapter_ids: enrollment.claimed_chapter_ids,
            is_course_reward_claimed: enrollment.is_course_reward_claimed,
            receipt_url: enrollment.receipt_url,
            promo_code: enrollment.promo_code,
            rejection_reason: enrollment.rejection_reason,
            last_accessed_at: format_primitive(enrollment.last_accessed_at),
            created_at: format_primitive(enrollment.created_at),
            updated_at: format_primitive(enrollment.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PriceBreakdown {
    pub(crate) base_price: f64,
    pub(crate) discount_amount: f64,
    pub(crate) final_price: f64,
}

impl From<Discount> for PriceBreakdown {
    fn from(value: Discount) -> Self {
        Self {
            base_price: value.base_price,
            discount_amount: value.discount_amount,
            final_price: value.final_price,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollResponse {
    pub(crate) message: String,
    pub(crate) enrollment: EnrollmentResponse,
    pub(crate) price: PriceBreakdown,
    pub(crate) promo_applied: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentCheckResponse {
    pub(crate) is_enrolled: bool,
    pub(crate) enrollment: Option<EnrollmentResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrolledCourseSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) thumbnail_url: String,
    pub(crate) level: CourseLevel,
    pub(crate) total_duration: String,
    pub(crate) completion_xp_bonus: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrolledCourseResponse {
    #[serde(flatten)]
    pub(crate) enrollment: EnrollmentResponse,
    pub(crate) course: EnrolledCourseSummary,
}

impl EnrolledCourseResponse {
    pub(crate) fn from_row(row: EnrollmentWithCourse) -> Self {
        let course = EnrolledCourseSummary {
            id: row.enrollment.course_id.clone(),
            title: row.course_title,
            thumbnail_url: row.course_thumbnail_url,
            level: row.course_level,
            total_duration: row.course_total_duration,
            completion_xp_bonus: row.course_completion_xp_bonus,
        };
        Self { enrollment: EnrollmentResponse::from_db(row.enrollment), course }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminEnrollmentQuery {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) package: Option<String>,
    #[serde(default)]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminEnrollmentResponse {
    #[serde(flatten)]
    pub(crate) enrollment: EnrollmentResponse,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) course_title: String,
}

impl AdminEnrollmentResponse {
    pub(crate) fn from_row(row: AdminEnrollmentRow) -> Self {
        Self {
            enrollment: EnrollmentResponse::from_db(row.enrollment),
            username: row.username,
            email: row.email,
            course_title: row.course_title,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectEnrollmentRequest {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}
