use async_trait::async_trait;

use crate::{
    AuthToken, Comment, CommentRef, DeletedComment, EditComment, EditedComment, Error, LikeToggled,
    NewComment, Post, PostId, PostSummary,
};

/// The authoritative comment service, as seen from a client.
///
/// Implementations own transport, persistence and authentication. The viewer
/// is always passed explicitly, and every mutating call is scoped to it.
#[async_trait]
pub trait CommentService: Send + Sync {
    async fn list_posts(&self, viewer: &AuthToken) -> Result<Vec<PostSummary>, Error>;

    /// Returns the post with its full flat comment list, each comment carrying
    /// the like count and the viewer's own like status
    async fn fetch_post(&self, viewer: &AuthToken, post: PostId) -> Result<Post, Error>;

    async fn create_comment(&self, viewer: &AuthToken, c: NewComment) -> Result<Comment, Error>;

    async fn update_comment(
        &self,
        viewer: &AuthToken,
        e: EditComment,
    ) -> Result<EditedComment, Error>;

    async fn delete_comment(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<DeletedComment, Error>;

    /// Adds the viewer's like if absent, removes it otherwise
    async fn toggle_comment_like(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<LikeToggled, Error>;
}
