use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::{
    api::{AuthToken, Comment, CommentId, CommentService, Error, Post, PostId},
    AsyncLoad, AsyncOp, CommentEngine, CommentStore, CommentTree, OpState, PostLoader,
    TreeIndexer,
};

/// Operation state for the actions available on one comment
#[derive(Debug, Default)]
pub struct CommentOps {
    pub reply: AsyncOp<Comment>,
    pub update: AsyncOp<()>,
    pub delete: AsyncOp<()>,
    pub toggle_like: AsyncOp<bool>,
}

/// Everything a viewer needs to read and discuss one post.
///
/// The post is fetched on the first call to `load`, which also seeds the
/// comment store. Afterwards, the tree is re-derived from the store on demand,
/// and each action goes through the engine while its state is tracked in an
/// `AsyncOp`, so that a failed action can be shown where it was attempted.
pub struct PostSession<S> {
    post_id: PostId,
    post: AsyncLoad<Post>,
    engine: CommentEngine<S>,
    indexer: Mutex<TreeIndexer>,
    create: AsyncOp<Comment>,
    comment_ops: Mutex<HashMap<CommentId, Arc<CommentOps>>>,
}

impl<S: 'static + CommentService> PostSession<S> {
    pub fn new(service: Arc<S>, viewer: AuthToken, post_id: PostId) -> PostSession<S> {
        let store = Arc::new(Mutex::new(CommentStore::new()));
        let loader = PostLoader::new(service.clone(), viewer);
        let post = {
            let store = store.clone();
            AsyncLoad::new(move || {
                let loader = loader.clone();
                let store = store.clone();
                async move {
                    let mut post = loader.load(post_id).await?;
                    let comments = std::mem::take(&mut post.comments);
                    store.lock().initialize(post.id, Some(comments));
                    Ok(post)
                }
            })
        };
        PostSession {
            post_id,
            post,
            engine: CommentEngine::new(service, viewer, store),
            indexer: Mutex::new(TreeIndexer::new()),
            create: AsyncOp::new(),
            comment_ops: Mutex::new(HashMap::new()),
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    /// Loads the post if it never was, and returns its state.
    ///
    /// The returned post has no comments: they live in the store.
    pub async fn load(&self) -> OpState<Post> {
        self.post.get().await
    }

    pub async fn reload(&self) -> Result<Post, Error> {
        self.post.reload().await
    }

    pub fn post(&self) -> OpState<Post> {
        self.post.state()
    }

    pub fn engine(&self) -> &CommentEngine<S> {
        &self.engine
    }

    pub fn tree(&self) -> Arc<CommentTree> {
        let snapshot = self.engine.store().lock().snapshot();
        self.indexer.lock().index(&snapshot)
    }

    pub fn root_comments(&self) -> Vec<Arc<Comment>> {
        self.tree().root_comments().to_vec()
    }

    pub fn replies(&self, parent: &CommentId) -> Vec<Arc<Comment>> {
        self.tree().replies(parent).to_vec()
    }

    /// State of the top-level comment form
    pub fn create_state(&self) -> OpState<Comment> {
        self.create.state()
    }

    pub fn comment_ops(&self, id: &CommentId) -> Arc<CommentOps> {
        self.comment_ops.lock().entry(*id).or_default().clone()
    }

    pub async fn create_comment(&self, message: String) -> Result<Comment, Error> {
        self.create
            .execute(self.engine.create_comment(self.post_id, message, None))
            .await
    }

    pub async fn reply(&self, parent: CommentId, message: String) -> Result<Comment, Error> {
        self.comment_ops(&parent)
            .reply
            .execute(
                self.engine
                    .create_comment(self.post_id, message, Some(parent)),
            )
            .await
    }

    pub async fn update_comment(&self, id: CommentId, message: String) -> Result<(), Error> {
        self.comment_ops(&id)
            .update
            .execute(self.engine.update_comment(self.post_id, id, message))
            .await
    }

    /// On success, also forgets the operation state of the deleted comment
    pub async fn delete_comment(&self, id: CommentId) -> Result<(), Error> {
        let res = self
            .comment_ops(&id)
            .delete
            .execute(self.engine.delete_comment(self.post_id, id))
            .await;
        if res.is_ok() {
            self.comment_ops.lock().remove(&id);
        }
        res
    }

    pub async fn toggle_comment_like(&self, id: CommentId) -> Result<bool, Error> {
        self.comment_ops(&id)
            .toggle_like
            .execute(self.engine.toggle_comment_like(self.post_id, id))
            .await
    }
}
