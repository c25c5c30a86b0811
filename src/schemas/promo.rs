use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::PromoCode;
use crate::db::types::{DiscountType, PackageTier};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PromoCodeCreate {
    pub(crate) code: String,
    #[serde(alias = "discountType")]
    pub(crate) discount_type: DiscountType,
    #[serde(alias = "discountValue")]
    #[validate(range(min = 0.0, message = "discount_value must be non-negative"))]
    pub(crate) discount_value: f64,
    #[serde(alias = "validFrom")]
    pub(crate) valid_from: String,
    #[serde(alias = "validUntil")]
    pub(crate) valid_until: String,
    #[serde(default)]
    #[serde(alias = "usageLimit")]
    #[validate(range(min = 0, message = "usage_limit must be non-negative"))]
    pub(crate) usage_limit: Option<i32>,
    #[serde(default)]
    #[serde(alias = "applicableCourses")]
    pub(crate) applicable_courses: Vec<String>,
    #[serde(default)]
    #[serde(alias = "applicablePackages")]
    pub(crate) applicable_packages: Vec<PackageTier>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromoValidateRequest {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "packageTier")]
    pub(crate) package_tier: Option<PackageTier>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PromoValidateResponse {
    pub(crate) valid: bool,
    pub(crate) code: String,
    pub(crate) discount_type: DiscountType,
    pub(crate) discount_value: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PromoCodeResponse {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) discount_type: DiscountType,
    pub(crate) discount_value: f64,
    pub(crate) valid_from: String,
    pub(crate) valid_until: String,
    pub(crate) usage_limit: Option<i32>,
    pub(crate) used_count: i32,
    pub(crate) is_active: bool,
    pub(crate) applicable_courses: Vec<String>,
    pub(crate) applicable_packages: Vec<PackageTier>,
    pub(crate) created_at: String,
}

impl PromoCodeResponse {
    pub(crate) fn from_db(promo: PromoCode) -> Self {
        Self {
            id: promo.id,
            code: promo.code,
            discount_type: promo.discount_type,
            discount_value: promo.discount_value,
            valid_from: format_primitive(promo.valid_from),
            valid_until: format_primitive(promo.valid_until),
            usage_limit: promo.usage_limit,
            used_count: promo.used_count,
            is_active: promo.is_active,
            applicable_courses: promo.applicable_courses.0,
            applicable_packages: promo.applicable_packages.0,
            created_at: format_primitive(promo.created_at),
        }
    }
}
