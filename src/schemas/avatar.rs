use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Avatar;
use crate::db::types::{AvatarType, UnlockCondition};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AvatarCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(alias = "imageUrl")]
    #[validate(length(min = 1, message = "image_url must not be empty"))]
    pub(crate) image_url: String,
    #[serde(default, rename = "type")]
    pub(crate) avatar_type: AvatarType,
    #[serde(default)]
    #[serde(alias = "unlockCondition")]
    pub(crate) unlock_condition: UnlockCondition,
    #[serde(default)]
    #[serde(alias = "requiredLevel")]
    #[validate(range(min = 0, message = "required_level must be non-negative"))]
    pub(crate) required_level: i32,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AvatarResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) image_url: String,
    #[serde(rename = "type")]
    pub(crate) avatar_type: AvatarType,
    pub(crate) unlock_condition: UnlockCondition,
    pub(crate) required_level: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl AvatarResponse {
    pub(crate) fn from_db(avatar: Avatar) -> Self {
        Self {
            id: avatar.id,
            name: avatar.name,
            image_url: avatar.image_url,
            avatar_type: avatar.avatar_type,
            unlock_condition: avatar.unlock_condition,
            required_level: avatar.required_level,
            is_active: avatar.is_active,
            created_at: format_primitive(avatar.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UserAvatarResponse {
    #[serde(flatten)]
    pub(crate) avatar: AvatarResponse,
    pub(crate) is_unlocked: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvatarSelection {
    #[serde(alias = "avatarId")]
    pub(crate) avatar_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AvatarUnlockResponse {
    pub(crate) message: String,
    pub(crate) avatar: AvatarResponse,
    pub(crate) avatar_unlock_tokens: i32,
}

fn default_true() -> bool {
    true
}
