use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::models::{Chapter, ChapterMaterial, Course};
use crate::db::types::{CourseLevel, CourseStatus, MaterialType, PackageTier};
use crate::repositories::courses::PackageColumns;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub(crate) struct PackagePayload {
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    pub(crate) price: f64,
    #[serde(default)]
    pub(crate) features: Vec<String>,
}

impl From<PackagePayload> for PackageColumns {
    fn from(value: PackagePayload) -> Self {
        Self { price: value.price, features: value.features }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PackagesPayload {
    #[validate(nested)]
    pub(crate) basic: PackagePayload,
    #[validate(nested)]
    pub(crate) advanced: PackagePayload,
    #[validate(nested)]
    pub(crate) premium: PackagePayload,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    #[serde(alias = "thumbnailUrl")]
    pub(crate) thumbnail_url: String,
    #[serde(default)]
    #[serde(alias = "tutorId")]
    pub(crate) tutor_id: Option<String>,
    #[validate(nested)]
    pub(crate) packages: PackagesPayload,
    #[serde(default)]
    pub(crate) status: CourseStatus,
    #[validate(length(min = 1, message = "category must not be empty"))]
    pub(crate) category: String,
    #[serde(default)]
    pub(crate) level: CourseLevel,
    #[serde(default)]
    #[serde(alias = "totalDuration")]
    pub(crate) total_duration: String,
    #[serde(default = "default_completion_xp_bonus")]
    #[serde(alias = "completionXpBonus")]
    #[validate(range(min = 0, message = "completion_xp_bonus must be non-negative"))]
    pub(crate) completion_xp_bonus: i64,
    #[serde(default)]
    #[serde(alias = "rewardAvatarId")]
    pub(crate) reward_avatar_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "thumbnailUrl")]
    pub(crate) thumbnail_url: Option<String>,
    #[serde(default)]
    #[serde(alias = "tutorId")]
    pub(crate) tutor_id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) basic: Option<PackagePayload>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) advanced: Option<PackagePayload>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) premium: Option<PackagePayload>,
    #[serde(default)]
    pub(crate) status: Option<CourseStatus>,
    #[serde(default)]
    pub(crate) category: Option<String>,
    #[serde(default)]
    pub(crate) level: Option<CourseLevel>,
    #[serde(default)]
    #[serde(alias = "totalDuration")]
    pub(crate) total_duration: Option<String>,
    #[serde(default)]
    #[serde(alias = "completionXpBonus")]
    #[validate(range(min = 0, message = "completion_xp_bonus must be non-negative"))]
    pub(crate) completion_xp_bonus: Option<i64>,
    #[serde(default)]
    #[serde(alias = "rewardAvatarId")]
    pub(crate) reward_avatar_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseListQuery {
    #[serde(default)]
    pub(crate) category: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PackageResponse {
    pub(crate) price: f64,
    pub(crate) features: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PackagesResponse {
    pub(crate) basic: PackageResponse,
    pub(crate) advanced: PackageResponse,
    pub(crate) premium: PackageResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) thumbnail_url: String,
    pub(crate) tutor_id: Option<String>,
    pub(crate) packages: PackagesResponse,
    pub(crate) status: CourseStatus,
    pub(crate) category: String,
    pub(crate) level: CourseLevel,
    pub(crate) total_duration: String,
    pub(crate) total_chapters: i32,
    pub(crate) enrolled_students: i32,
    pub(crate) completion_xp_bonus: i64,
    pub(crate) reward_avatar_id: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course) -> Self {
        let package = |tier: PackageTier| PackageResponse {
            price: course.package_price(tier),
            features: course.package_features(tier).to_vec(),
        };
        let packages = PackagesResponse {
            basic: package(PackageTier::Basic),
            advanced: package(PackageTier::Advanced),
            premium: package(PackageTier::Premium),
        };

        Self {
            packages,
            id: course.id,
            title: course.title,
            description: course.description,
            thumbnail_url: course.thumbnail_url,
            tutor_id: course.tutor_id,
            status: course.status,
            category: course.category,
            level: course.level,
            total_duration: course.total_duration,
            total_chapters: course.total_chapters,
            enrolled_students: course.enrolled_students,
            completion_xp_bonus: course.completion_xp_bonus,
            reward_avatar_id: course.reward_avatar_id,
            created_at: format_primitive(course.created_at),
            updated_at: format_primitive(course.updated_at),
        }
    }
}

/// Public material listing: never carries the URL.
#[derive(Debug, Serialize)]
pub(crate) struct MaterialOutline {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(rename = "type")]
    pub(crate) material_type: MaterialType,
    pub(crate) min_package_tier: PackageTier,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChapterOutline {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) position: i32,
    pub(crate) xp_reward: i64,
    pub(crate) materials: Vec<MaterialOutline>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseDetailResponse {
    #[serde(flatten)]
    pub(crate) course: CourseResponse,
    pub(crate) chapters: Vec<ChapterOutline>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChapterCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "position must be non-negative"))]
    pub(crate) position: Option<i32>,
    #[serde(default = "default_xp_reward")]
    #[serde(alias = "xpReward")]
    #[validate(range(min = 0, message = "xp_reward must be non-negative"))]
    pub(crate) xp_reward: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChapterUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "position must be non-negative"))]
    pub(crate) position: Option<i32>,
    #[serde(default)]
    #[serde(alias = "xpReward")]
    #[validate(range(min = 0, message = "xp_reward must be non-negative"))]
    pub(crate) xp_reward: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChapterResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) position: i32,
    pub(crate) xp_reward: i64,
    pub(crate) created_at: String,
}

impl ChapterResponse {
    pub(crate) fn from_db(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            course_id: chapter.course_id,
            title: chapter.title,
            description: chapter.description,
            position: chapter.position,
            xp_reward: chapter.xp_reward,
            created_at: format_primitive(chapter.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct MaterialCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(rename = "type")]
    pub(crate) material_type: MaterialType,
    #[validate(length(min = 1, message = "url must not be empty"))]
    pub(crate) url: String,
    #[serde(default)]
    #[serde(alias = "minPackageTier")]
    pub(crate) min_package_tier: PackageTier,
    #[serde(default)]
    #[serde(alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct MaterialUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) material_type: Option<MaterialType>,
    #[serde(default)]
    #[validate(length(min = 1, message = "url must not be empty"))]
    pub(crate) url: Option<String>,
    #[serde(default)]
    #[serde(alias = "minPackageTier")]
    pub(crate) min_package_tier: Option<PackageTier>,
    #[serde(default)]
    #[serde(alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MaterialResponse {
    pub(crate) id: String,
    pub(crate) chapter_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    #[serde(rename = "type")]
    pub(crate) material_type: MaterialType,
    pub(crate) url: String,
    pub(crate) min_package_tier: PackageTier,
    pub(crate) order_index: i32,
}

impl MaterialResponse {
    pub(crate) fn from_db(material: ChapterMaterial) -> Self {
        Self {
            id: material.id,
            chapter_id: material.chapter_id,
            title: material.title,
            description: material.description,
            material_type: material.material_type,
            url: material.url,
            min_package_tier: material.min_package_tier,
            order_index: material.order_index,
        }
    }
}

fn default_completion_xp_bonus() -> i64 {
    100
}

fn default_xp_reward() -> i64 {
    10
}
