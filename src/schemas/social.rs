use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::FriendRequest;
use crate::db::types::{CourseLevel, EnrollmentStatus, FriendRequestStatus};
use crate::repositories::enrollments::EnrollmentWithCourse;
use crate::repositories::friend_requests::IncomingRequestRow;
use crate::schemas::avatar::AvatarResponse;
use crate::schemas::user::{PublicUserResponse, UserSummaryResponse};
use crate::services::social::FriendStatus;

#[derive(Debug, Serialize)]
pub(crate) struct FriendRequestResponse {
    pub(crate) id: String,
    pub(crate) requester_id: String,
    pub(crate) recipient_id: String,
    pub(crate) status: FriendRequestStatus,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl FriendRequestResponse {
    pub(crate) fn from_db(request: FriendRequest) -> Self {
        Self {
            id: request.id,
            requester_id: request.requester_id,
            recipient_id: request.recipient_id,
            status: request.status,
            created_at: format_primitive(request.created_at),
            updated_at: format_primitive(request.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct IncomingFriendRequestResponse {
    pub(crate) id: String,
    pub(crate) requester: UserSummaryResponse,
    pub(crate) created_at: String,
}

impl IncomingFriendRequestResponse {
    pub(crate) fn from_db(row: IncomingRequestRow) -> Self {
        Self {
            id: row.request_id,
            requester: UserSummaryResponse::from_db(row.requester),
            created_at: format_primitive(row.requested_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileCourseResponse {
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) thumbnail_url: String,
    pub(crate) level: CourseLevel,
    pub(crate) progress: i32,
    pub(crate) status: EnrollmentStatus,
}

impl ProfileCourseResponse {
    pub(crate) fn from_db(row: EnrollmentWithCourse) -> Self {
        Self {
            course_id: row.enrollment.course_id,
            title: row.course_title,
            thumbnail_url: row.course_thumbnail_url,
            level: row.course_level,
            progress: row.enrollment.progress,
            status: row.enrollment.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SocialStats {
    pub(crate) followers: i64,
    pub(crate) following: i64,
    pub(crate) friends: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublicProfileResponse {
    pub(crate) user: PublicUserResponse,
    pub(crate) stats: SocialStats,
    pub(crate) is_following: bool,
    pub(crate) friend_status: FriendStatus,
    pub(crate) request_id: Option<String>,
    pub(crate) unlocked_avatars: Vec<AvatarResponse>,
    pub(crate) enrolled_courses: Vec<ProfileCourseResponse>,
    pub(crate) completed_courses: Vec<ProfileCourseResponse>,
}
