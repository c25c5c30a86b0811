use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Tutor,
    Admin,
}

/// Course packages, totally ordered basic < advanced < premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "packagetier", rename_all = "lowercase")]
pub(crate) enum PackageTier {
    #[default]
    Basic,
    Advanced,
    Premium,
}

impl PackageTier {
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Advanced => 2,
            Self::Premium => 3,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Premium => "premium",
        }
    }
}

impl FromStr for PackageTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            "premium" => Ok(Self::Premium),
            other => Err(format!("Invalid package type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "enrollmentstatus", rename_all = "lowercase")]
pub(crate) enum EnrollmentStatus {
    Pending,
    Active,
    Rejected,
    Completed,
}

impl EnrollmentStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Statuses that grant access to content and count towards `enrolled_students`.
    pub(crate) fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            other => Err(format!("Invalid enrollment status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "discounttype", rename_all = "lowercase")]
pub(crate) enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "materialtype", rename_all = "lowercase")]
pub(crate) enum MaterialType {
    Video,
    Pdf,
    Link,
    Slide,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "coursestatus", rename_all = "lowercase")]
pub(crate) enum CourseStatus {
    #[default]
    Ongoing,
    Complete,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "courselevel", rename_all = "lowercase")]
pub(crate) enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "avatartype", rename_all = "lowercase")]
pub(crate) enum AvatarType {
    #[default]
    Default,
    Premium,
    Reward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "unlockcondition", rename_all = "snake_case")]
pub(crate) enum UnlockCondition {
    #[default]
    None,
    CourseCompletion,
    LevelUp,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "notificationtype", rename_all = "lowercase")]
pub(crate) enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "friendrequeststatus", rename_all = "lowercase")]
pub(crate) enum FriendRequestStatus {
    Pending,
    Accepted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(PackageTier::Basic.rank() < PackageTier::Advanced.rank());
        assert!(PackageTier::Advanced.rank() < PackageTier::Premium.rank());
        assert_eq!(PackageTier::default(), PackageTier::Basic);
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("Premium".parse::<PackageTier>(), Ok(PackageTier::Premium));
        assert_eq!(" advanced ".parse::<PackageTier>(), Ok(PackageTier::Advanced));
        assert!("gold".parse::<PackageTier>().is_err());
    }

    #[test]
    fn only_active_and_completed_grant_access() {
        assert!(EnrollmentStatus::Active.grants_access());
        assert!(EnrollmentStatus::Completed.grants_access());
        assert!(!EnrollmentStatus::Pending.grants_access());
        assert!(!EnrollmentStatus::Rejected.grants_access());
    }

    #[test]
    fn status_filter_parses() {
        assert_eq!("PENDING".parse::<EnrollmentStatus>(), Ok(EnrollmentStatus::Pending));
        assert!("all".parse::<EnrollmentStatus>().is_err());
    }
}
