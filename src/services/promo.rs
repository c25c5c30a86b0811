use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::PromoCode;
use crate::db::types::{DiscountType, PackageTier};

#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum PromoRejection {
    #[error("Invalid promo code")]
    NotFound,
    #[error("This promo code is inactive")]
    Inactive,
    #[error("This promo code is not valid yet")]
    NotYetValid,
    #[error("This promo code has expired")]
    Expired,
    #[error("This promo code usage limit has been reached")]
    LimitReached,
    #[error("This promo code is not valid for this course")]
    CourseNotApplicable,
    #[error("This promo code is only valid for: {0}")]
    PackageNotApplicable(String),
}

impl PromoRejection {
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Inactive => "inactive",
            Self::NotYetValid => "not_yet_valid",
            Self::Expired => "expired",
            Self::LimitReached => "limit_reached",
            Self::CourseNotApplicable => "course_not_applicable",
            Self::PackageNotApplicable(_) => "package_not_applicable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Discount {
    pub(crate) base_price: f64,
    pub(crate) discount_amount: f64,
    pub(crate) final_price: f64,
}

pub(crate) const MIN_CODE_LEN: usize = 3;

pub(crate) fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalises a new admin-supplied code; the length rule applies after trimming.
pub(crate) fn new_code(raw: &str) -> Option<String> {
    let code = normalize_code(raw);
    (code.chars().count() >= MIN_CODE_LEN).then_some(code)
}

/// Runs the rejection checks in order. Restriction lists are only consulted when the
/// caller names a course or package.
pub(crate) fn check(
    promo: Option<&PromoCode>,
    course_id: Option<&str>,
    tier: Option<PackageTier>,
    now: PrimitiveDateTime,
) -> Result<(), PromoRejection> {
    let promo = promo.ok_or(PromoRejection::NotFound)?;

    if !promo.is_active {
        return Err(PromoRejection::Inactive);
    }
    if now < promo.valid_from {
        return Err(PromoRejection::NotYetValid);
    }
    if now > promo.valid_until {
        return Err(PromoRejection::Expired);
    }
    if let Some(limit) = promo.usage_limit.filter(|limit| *limit > 0) {
        if promo.used_count >= limit {
            return Err(PromoRejection::LimitReached);
        }
    }

    let courses = &promo.applicable_courses.0;
    if let Some(course_id) = course_id {
        if !courses.is_empty() && !courses.iter().any(|item| item == course_id) {
            return Err(PromoRejection::CourseNotApplicable);
        }
    }

    let packages = &promo.applicable_packages.0;
    if let Some(tier) = tier {
        if !packages.is_empty() && !packages.contains(&tier) {
            let allowed =
                packages.iter().map(|item| item.as_str()).collect::<Vec<_>>().join(", ");
            return Err(PromoRejection::PackageNotApplicable(allowed));
        }
    }

    Ok(())
}

/// Percentage discounts are not capped on their own; only the final price floors at zero.
pub(crate) fn apply_discount(promo: &PromoCode, base_price: f64) -> Discount {
    let discount_amount = match promo.discount_type {
        DiscountType::Percentage => base_price * promo.discount_value / 100.0,
        DiscountType::Fixed => promo.discount_value,
    };

    Discount { base_price, discount_amount, final_price: (base_price - discount_amount).max(0.0) }
}

pub(crate) fn evaluate(
    promo: Option<&PromoCode>,
    course_id: &str,
    tier: PackageTier,
    base_price: f64,
    now: PrimitiveDateTime,
) -> Result<Discount, PromoRejection> {
    check(promo, Some(course_id), Some(tier), now)?;
    let promo = promo.ok_or(PromoRejection::NotFound)?;
    Ok(apply_discount(promo, base_price))
}
