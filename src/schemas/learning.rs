use serde::Serialize;

use crate::db::types::EnrollmentStatus;
use crate::schemas::avatar::AvatarResponse;
use crate::schemas::course::{ChapterResponse, MaterialResponse};
use crate::schemas::enrollment::EnrollmentResponse;
use crate::services::access::ChapterContent;
use crate::services::leveling::LevelOutcome;

#[derive(Debug, Serialize)]
pub(crate) struct SecureCourseSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) thumbnail_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SecureChapterResponse {
    #[serde(flatten)]
    pub(crate) chapter: ChapterResponse,
    pub(crate) materials: Vec<MaterialResponse>,
}

impl SecureChapterResponse {
    pub(crate) fn from_content(content: ChapterContent) -> Self {
        Self {
            chapter: ChapterResponse::from_db(content.chapter),
            materials: content.materials.into_iter().map(MaterialResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SecureContentResponse {
    pub(crate) course: SecureCourseSummary,
    pub(crate) chapters: Vec<SecureChapterResponse>,
    pub(crate) user_progress: EnrollmentResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToggleMaterialResponse {
    pub(crate) success: bool,
    pub(crate) completed: bool,
    pub(crate) progress: i32,
    pub(crate) completed_chapters: Vec<String>,
    pub(crate) status: EnrollmentStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClaimResponse {
    pub(crate) success: bool,
    pub(crate) claimed_xp: i64,
    pub(crate) new_total_xp: i64,
    pub(crate) new_level: i32,
    pub(crate) leveled_up: bool,
    pub(crate) tokens_earned: i32,
    pub(crate) new_tokens: i32,
}

impl ClaimResponse {
    pub(crate) fn new(claimed_xp: i64, level: &LevelOutcome) -> Self {
        Self {
            success: true,
            claimed_xp,
            new_total_xp: level.progression.xp_points,
            new_level: level.progression.level,
            leveled_up: level.leveled_up(),
            tokens_earned: level.levels_gained,
            new_tokens: level.progression.avatar_unlock_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseClaimResponse {
    #[serde(flatten)]
    pub(crate) claim: ClaimResponse,
    pub(crate) reward_avatar: Option<AvatarResponse>,
}
