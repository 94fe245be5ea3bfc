use std::sync::Arc;

use crate::api::{AuthToken, CommentService, Error, Post, PostId};

/// Fetches a post and its whole flat comment list in one call.
///
/// Loading has no side effect: callers seed a `CommentStore` with the result.
pub struct PostLoader<S> {
    service: Arc<S>,
    viewer: AuthToken,
}

impl<S> Clone for PostLoader<S> {
    fn clone(&self) -> PostLoader<S> {
        PostLoader {
            service: self.service.clone(),
            viewer: self.viewer,
        }
    }
}

impl<S: CommentService> PostLoader<S> {
    pub fn new(service: Arc<S>, viewer: AuthToken) -> PostLoader<S> {
        PostLoader { service, viewer }
    }

    pub async fn load(&self, post: PostId) -> Result<Post, Error> {
        let res = self.service.fetch_post(&self.viewer, post).await;
        match &res {
            Ok(p) => tracing::debug!(?post, num_comments = p.comments.len(), "loaded post"),
            Err(err) => tracing::debug!(?post, %err, "failed loading post"),
        }
        res
    }
}
