pub(crate) mod auth;
pub(crate) mod avatars;
pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod learning;
pub(crate) mod notifications;
pub(crate) mod pagination;
pub(crate) mod profile;
pub(crate) mod promo_codes;
pub(crate) mod router;
pub(crate) mod social;
pub(crate) mod uploads;
pub(crate) mod validation;
