//! Engagement models: per-user interaction state, comments and reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Per (user, prompt) interaction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPromptInteraction {
    pub user_id: Uuid,
    pub prompt_id: Uuid,
    pub is_liked: bool,
    pub is_saved: bool,
    pub rating: Option<i16>,
    pub view_count: i32,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub liked_at: Option<DateTime<Utc>>,
    pub saved_at: Option<DateTime<Utc>>,
    pub rated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SetLikeRequest {
    pub liked: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SetSaveRequest {
    pub saved: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct RateRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub stars: i16,
}

/// Result of a like/save toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    /// False when the request matched the stored value.
    pub changed: bool,
    pub value: bool,
    /// Prompt counter after the operation.
    pub count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub previous: Option<i16>,
    pub stars: i16,
    pub rating_count: i32,
    pub average_rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewOutcome {
    pub view_count: i64,
    pub user_view_count: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    Visible,
    Hidden,
    Deleted,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Visible => "visible",
            CommentStatus::Hidden => "hidden",
            CommentStatus::Deleted => "deleted",
        }
    }

    /// Change applied to the prompt's visible-comment counter when moving from `self` to `to`.
    pub fn counter_delta(self, to: CommentStatus) -> i32 {
        match (self == CommentStatus::Visible, to == CommentStatus::Visible) {
            (true, false) => -1,
            (false, true) => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "visible" => Ok(CommentStatus::Visible),
            "hidden" => Ok(CommentStatus::Hidden),
            "deleted" => Ok(CommentStatus::Deleted),
            _ => Err(format!("Invalid comment status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub text: String,
    pub status: CommentStatus,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment as shown in a thread. Deleted comments keep their place without text.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub text: Option<String>,
    pub status: CommentStatus,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: Comment, username: String) -> Self {
        let deleted = comment.status == CommentStatus::Deleted;
        Self {
            id: comment.id,
            parent_id: comment.parent_id,
            user_id: (!deleted).then_some(comment.user_id),
            username: (!deleted).then_some(username),
            text: (!deleted).then_some(comment.text),
            status: comment.status,
            like_count: comment.like_count,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
    pub items: Vec<CommentView>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Comment must be 1-5000 characters"))]
    pub text: String,

    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SetCommentStatusRequest {
    pub status: CommentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCommentsQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WriteReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[validate(length(min = 1, max = 5000, message = "Review must be 1-5000 characters"))]
    pub comment: String,
}
