use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    api::{
        self, AuthToken, Comment, CommentId, CommentRef, CommentService, EditComment, Error,
        NewComment, PostId,
    },
    CommentPatch, CommentStore,
};

/// Applies the viewer's comment operations to the service, then to the store.
///
/// The store is only ever touched after the service confirmed the operation,
/// with what the service answered, so a failed call leaves it as it was. Calls
/// may run concurrently: their effects land in the order they settle.
pub struct CommentEngine<S> {
    service: Arc<S>,
    viewer: AuthToken,
    store: Arc<Mutex<CommentStore>>,
}

impl<S> Clone for CommentEngine<S> {
    fn clone(&self) -> CommentEngine<S> {
        CommentEngine {
            service: self.service.clone(),
            viewer: self.viewer,
            store: self.store.clone(),
        }
    }
}

impl<S: CommentService> CommentEngine<S> {
    pub fn new(service: Arc<S>, viewer: AuthToken, store: Arc<Mutex<CommentStore>>) -> Self {
        CommentEngine {
            service,
            viewer,
            store,
        }
    }

    pub fn viewer(&self) -> AuthToken {
        self.viewer
    }

    pub fn store(&self) -> &Arc<Mutex<CommentStore>> {
        &self.store
    }

    pub async fn create_comment(
        &self,
        post_id: PostId,
        message: String,
        parent_id: Option<CommentId>,
    ) -> Result<Comment, Error> {
        api::validate_message(&message)?;
        let created = self
            .service
            .create_comment(
                &self.viewer,
                NewComment {
                    post_id,
                    message,
                    parent_id,
                },
            )
            .await?;
        let comment = Comment {
            like_count: 0,
            liked_by_me: false,
            ..created
        };
        self.reconcile(post_id, |store| store.insert(comment.clone()));
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        post_id: PostId,
        id: CommentId,
        message: String,
    ) -> Result<(), Error> {
        api::validate_message(&message)?;
        let edited = self
            .service
            .update_comment(
                &self.viewer,
                EditComment {
                    post_id,
                    id,
                    message,
                },
            )
            .await?;
        self.reconcile(post_id, |store| {
            store.patch(&id, CommentPatch::message(edited.message));
        });
        Ok(())
    }

    pub async fn delete_comment(&self, post_id: PostId, id: CommentId) -> Result<(), Error> {
        let deleted = self
            .service
            .delete_comment(&self.viewer, CommentRef { post_id, id })
            .await?;
        self.reconcile(post_id, |store| {
            store.remove(&deleted.id);
        });
        Ok(())
    }

    /// Returns whether the viewer now likes the comment.
    ///
    /// The local like status is not consulted: the service decides whether
    /// this toggle adds or removes the like, and the store follows.
    pub async fn toggle_comment_like(&self, post_id: PostId, id: CommentId) -> Result<bool, Error> {
        let toggled = self
            .service
            .toggle_comment_like(&self.viewer, CommentRef { post_id, id })
            .await?;
        self.reconcile(post_id, |store| {
            store.adjust_like(&id, toggled.add_like);
        });
        Ok(toggled.add_like)
    }

    /// Applies a settled operation, unless the store moved on to another post
    /// in the meantime
    fn reconcile(&self, post_id: PostId, f: impl FnOnce(&mut CommentStore)) {
        let mut store = self.store.lock();
        if store.post() != Some(post_id) {
            tracing::warn!(
                ?post_id,
                current = ?store.post(),
                "dropping settlement for a post that is no longer being viewed"
            );
            return;
        }
        f(&mut store);
    }
}
