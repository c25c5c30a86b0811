pub(crate) mod avatars;
pub(crate) mod chapters;
pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod follows;
pub(crate) mod friend_requests;
pub(crate) mod health;
pub(crate) mod materials;
pub(crate) mod notifications;
pub(crate) mod promo_codes;
pub(crate) mod users;
