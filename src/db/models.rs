use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AvatarType, CourseLevel, CourseStatus, DiscountType, EnrollmentStatus, FriendRequestStatus,
    MaterialType, NotificationType, PackageTier, UnlockCondition, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
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
    pub(crate) show_nexons: bool,
    pub(crate) show_courses: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Public card of another user, as shown in follower and friend lists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UserSummary {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) current_avatar_url: Option<String>,
    pub(crate) role: UserRole,
    pub(crate) level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Avatar {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) image_url: String,
    pub(crate) avatar_type: AvatarType,
    pub(crate) unlock_condition: UnlockCondition,
    pub(crate) required_level: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) thumbnail_url: String,
    pub(crate) tutor_id: Option<String>,
    pub(crate) basic_price: f64,
    pub(crate) basic_features: Json<Vec<String>>,
    pub(crate) advanced_price: f64,
    pub(crate) advanced_features: Json<Vec<String>>,
    pub(crate) premium_price: f64,
    pub(crate) premium_features: Json<Vec<String>>,
    pub(crate) status: CourseStatus,
    pub(crate) category: String,
    pub(crate) level: CourseLevel,
    pub(crate) total_duration: String,
    pub(crate) total_chapters: i32,
    pub(crate) enrolled_students: i32,
    pub(crate) completion_xp_bonus: i64,
    pub(crate) reward_avatar_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Course {
    pub(crate) fn package_price(&self, tier: PackageTier) -> f64 {
        match tier {
            PackageTier::Basic => self.basic_price,
            PackageTier::Advanced => self.advanced_price,
            PackageTier::Premium => self.premium_price,
        }
    }

    pub(crate) fn package_features(&self, tier: PackageTier) -> &[String] {
        match tier {
            PackageTier::Basic => &self.basic_features.0,
            PackageTier::Advanced => &self.advanced_features.0,
            PackageTier::Premium => &self.premium_features.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Chapter {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) position: i32,
    pub(crate) xp_reward: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ChapterMaterial {
    pub(crate) id: String,
    pub(crate) chapter_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) material_type: MaterialType,
    pub(crate) url: String,
    pub(crate) min_package_tier: PackageTier,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct PromoCode {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) discount_type: DiscountType,
    pub(crate) discount_value: f64,
    pub(crate) valid_from: PrimitiveDateTime,
    pub(crate) valid_until: PrimitiveDateTime,
    pub(crate) usage_limit: Option<i32>,
    pub(crate) used_count: i32,
    pub(crate) is_active: bool,
    pub(crate) applicable_courses: Json<Vec<String>>,
    pub(crate) applicable_packages: Json<Vec<PackageTier>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Enrollment {
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
    pub(crate) promo_code_id: Option<String>,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) last_accessed_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Notification {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) notification_type: NotificationType,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) is_read: bool,
    pub(crate) link: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct FriendRequest {
    pub(crate) id: String,
    pub(crate) requester_id: String,
    pub(crate) recipient_id: String,
    pub(crate) status: FriendRequestStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
