//! Record shapes shared across the carrier core.
//!
//! These are the four persisted record families plus the read-only
//! projections served to peer devices. Everything is plain serde data; the
//! store engine owns the only copy of record state and every other component
//! reads through it.

use serde::{Deserialize, Serialize};

/// How long a session stays valid after login or verification: 7 days.
pub const SESSION_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// The authenticated operator session. Exactly one may exist at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub user_id: u64,
    pub is_admin: bool,
    /// Milliseconds since epoch; refreshed on successful verification.
    pub logged_in_at: u64,
    /// Always `logged_in_at + SESSION_TTL_MS`.
    pub expires_at: u64,
}

impl Session {
    /// Build a session starting at `now`, expiring after the fixed TTL.
    pub fn starting_at(username: String, user_id: u64, is_admin: bool, now: u64) -> Self {
        Self {
            username,
            user_id,
            is_admin,
            logged_in_at: now,
            expires_at: now + SESSION_TTL_MS,
        }
    }

    /// A session is valid through `expires_at` inclusive and absent strictly
    /// after it.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

/// Sync metadata written alongside every successful snapshot download.
///
/// Its presence gates snapshot validity: if it is absent, all four content
/// collections read as empty regardless of what is on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInfo {
    /// Backend-reported sync timestamp, carried verbatim (RFC3339).
    pub timestamp: String,
    pub total_topics: u64,
    pub total_users: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub year: String,
    /// Department-membership set; a course may belong to several departments.
    #[serde(default)]
    pub departments: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: u64,
    pub course_id: u64,
    pub title: String,
    #[serde(default)]
    pub page_range: String,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub refined_summary: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Topic {
    /// Whether a refined version of the summary exists (non-empty).
    pub fn is_refined(&self) -> bool {
        self.refined_summary
            .as_deref()
            .is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumUser {
    pub id: u64,
    pub name: String,
    pub code: String,
}

/// The complete cached copy of remote content, replaced wholesale on every
/// successful download and never partially merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub departments: Vec<Department>,
    pub courses: Vec<Course>,
    pub topics: Vec<Topic>,
    pub premium_users: Vec<PremiumUser>,
    pub sync_info: Option<SyncInfo>,
}

/// A locally created registration awaiting backend acknowledgment.
///
/// `synced` transitions are monotone false to true, never reversed; only the
/// uploader flips it, and only the explicit delete-synced operation (or the
/// retention sweep) removes records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    /// Store-assigned auto-increment key.
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub department_id: Option<u64>,
    pub synced: bool,
    pub created_at: u64,
    #[serde(default)]
    pub synced_at: Option<u64>,
}

/// Topic metadata served by the listing endpoint.
///
/// Full text is withheld from listings; peers fetch bodies one topic at a
/// time over the constrained local link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: u64,
    pub title: String,
    pub page_range: String,
    pub updated_at: String,
    pub is_refined: bool,
    pub is_premium: bool,
}

impl From<&Topic> for TopicSummary {
    fn from(topic: &Topic) -> Self {
        Self {
            id: topic.id,
            title: topic.title.clone(),
            page_range: topic.page_range.clone(),
            updated_at: topic.updated_at.clone(),
            is_refined: topic.is_refined(),
            is_premium: topic.is_premium,
        }
    }
}

/// Full topic detail with course and department names resolved from the
/// cached collections (the responder has no join capability of its own).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDetail {
    pub id: u64,
    pub title: String,
    pub page_range: String,
    pub refined_summary: Option<String>,
    pub raw_text: String,
    pub course_name: String,
    pub course_year: String,
    pub departments: Vec<String>,
    pub updated_at: String,
    pub created_at: String,
    pub is_premium: bool,
}

impl TopicDetail {
    /// Resolve a topic against the snapshot it came from.
    pub fn resolve(topic: &Topic, snapshot: &ContentSnapshot) -> Self {
        let course = snapshot.courses.iter().find(|c| c.id == topic.course_id);
        let departments = course
            .map(|course| {
                snapshot
                    .departments
                    .iter()
                    .filter(|d| course.departments.contains(&d.id))
                    .map(|d| d.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: topic.id,
            title: topic.title.clone(),
            page_range: topic.page_range.clone(),
            refined_summary: topic.refined_summary.clone(),
            raw_text: topic.raw_text.clone(),
            course_name: course.map_or_else(|| "Unknown".to_string(), |c| c.name.clone()),
            course_year: course.map_or_else(String::new, |c| c.year.clone()),
            departments,
            updated_at: topic.updated_at.clone(),
            created_at: topic.created_at.clone(),
            is_premium: topic.is_premium,
        }
    }
}
