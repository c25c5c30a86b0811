use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{User, UserSummary};
use crate::db::types::UserRole;

#[derive(Debug, Serialize)]
pub(crate) struct PrivacySettings {
    pub(crate) show_nexons: bool,
    pub(crate) show_courses: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) role: UserRole,
    pub(crate) xp_points: i64,
    pub(crate) level: i32,
    pub(crate) avatar_unlock_tokens: i32,
    pub(crate) current_avatar_url: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) major: Option<String>,
    pub(crate) semester: Option<String>,
    pub(crate) bio: Option<String>,
    pub(crate) privacy_settings: PrivacySettings,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            xp_points: user.xp_points,
            level: user.level,
            avatar_unlock_tokens: user.avatar_unlock_tokens,
            current_avatar_url: user.current_avatar_url,
            is_active: user.is_active,
            first_name: user.first_name,
            last_name: user.last_name,
            major: user.major,
            semester: user.semester,
            bio: user.bio,
            privacy_settings: PrivacySettings {
                show_nexons: user.show_nexons,
                show_courses: user.show_courses,
            },
            created_at: format_primitive(user.created_at),
        }
    }
}

/// What other users may see: no email, no token balance.
#[derive(Debug, Serialize)]
pub(crate) struct PublicUserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) role: UserRole,
    pub(crate) xp_points: i64,
    pub(crate) level: i32,
    pub(crate) current_avatar_url: Option<String>,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) major: Option<String>,
    pub(crate) semester: Option<String>,
    pub(crate) bio: Option<String>,
    pub(crate) created_at: String,
}

impl PublicUserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            xp_points: user.xp_points,
            level: user.level,
            current_avatar_url: user.current_avatar_url,
            first_name: user.first_name,
            last_name: user.last_name,
            major: user.major,
            semester: user.semester,
            bio: user.bio,
            created_at: format_primitive(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UserSummaryResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) current_avatar_url: Option<String>,
    pub(crate) role: UserRole,
    pub(crate) level: i32,
}

impl UserSummaryResponse {
    pub(crate) fn from_db(user: UserSummary) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            current_avatar_url: user.current_avatar_url,
            role: user.role,
            level: user.level,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PrivacySettingsUpdate {
    #[serde(default)]
    #[serde(alias = "showNexons")]
    pub(crate) show_nexons: Option<bool>,
    #[serde(default)]
    #[serde(alias = "showCourses")]
    pub(crate) show_courses: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProfileUpdate {
    #[serde(default)]
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub(crate) last_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255, message = "major must be at most 255 characters"))]
    pub(crate) major: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "semester must be at most 50 characters"))]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub(crate) bio: Option<String>,
    #[serde(default)]
    #[serde(alias = "privacySettings")]
    pub(crate) privacy_settings: Option<PrivacySettingsUpdate>,
}
