use uuid::Uuid;

use crate::{PostId, Time, User};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

/// A comment as the service reports it to one given viewer
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub message: String,

    /// `None` for a top-level comment on the post
    pub parent_id: Option<CommentId>,

    pub created_at: Time,
    pub user: User,

    /// Number of distinct users currently liking this comment
    pub like_count: u64,

    /// Whether the viewer this comment was fetched for is one of them
    pub liked_by_me: bool,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewComment {
    pub post_id: PostId,
    pub message: String,
    pub parent_id: Option<CommentId>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EditComment {
    pub post_id: PostId,
    pub id: CommentId,
    pub message: String,
}

/// Addresses one comment of one post, for deletion and like toggling
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CommentRef {
    pub post_id: PostId,
    pub id: CommentId,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EditedComment {
    pub message: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DeletedComment {
    pub id: CommentId,
}

/// Outcome of a like toggle, as decided by the service.
///
/// `add_like` is true if the viewer did not like the comment before the
/// call, and now does.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggled {
    pub add_like: bool,
}
