use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::TimeZone;
use comments_api::{
    self as api, AuthToken, Comment, CommentId, CommentRef, CommentService, DeletedComment,
    EditComment, EditedComment, Error, LikeToggled, NewComment, Post, PostId, PostSummary, Time,
    User, UserId, Uuid,
};
use parking_lot::{Mutex, MutexGuard};

/// In-memory stand-in for the comment service, enforcing the same rules
pub struct MockServer {
    users: BTreeMap<UserId, DbUser>,
    sessions: HashMap<AuthToken, UserId>,
    posts: BTreeMap<PostId, DbPost>,
    clock: Time,
}

#[derive(Debug)]
struct DbUser {
    name: String,
}

#[derive(Debug)]
struct DbPost {
    title: String,
    body: String,
    comments: Vec<DbComment>,
}

#[derive(Debug)]
struct DbComment {
    id: CommentId,
    message: String,
    parent_id: Option<CommentId>,
    created_at: Time,
    owner: UserId,
    likes: HashSet<UserId>,
}

impl DbPost {
    fn comment(&self, id: &CommentId) -> Result<&DbComment, Error> {
        self.comments
            .iter()
            .find(|c| c.id == *id)
            .ok_or(Error::CommentNotFound(*id))
    }

    fn comment_mut(&mut self, id: &CommentId) -> Result<&mut DbComment, Error> {
        self.comments
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(Error::CommentNotFound(*id))
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            sessions: HashMap::new(),
            posts: BTreeMap::new(),
            clock: chrono::Utc
                .timestamp_opt(1_600_000_000, 0)
                .single()
                .expect("mock server epoch is a valid timestamp"),
        }
    }

    /// Creates a user along with a first session for it
    pub fn create_user(&mut self, name: &str) -> (UserId, AuthToken) {
        let id = UserId(Uuid::new_v4());
        self.users.insert(
            id,
            DbUser {
                name: String::from(name),
            },
        );
        let tok = AuthToken(Uuid::new_v4());
        self.sessions.insert(tok, id);
        (id, tok)
    }

    pub fn auth(&mut self, user: UserId) -> Result<AuthToken, Error> {
        if !self.users.contains_key(&user) {
            return Err(Error::PermissionDenied(String::from("unknown user")));
        }
        let tok = AuthToken(Uuid::new_v4());
        self.sessions.insert(tok, user);
        Ok(tok)
    }

    pub fn unauth(&mut self, tok: AuthToken) -> Result<(), Error> {
        self.sessions
            .remove(&tok)
            .map(|_| ())
            .ok_or_else(|| Error::PermissionDenied(String::from("unknown session")))
    }

    pub fn create_post(&mut self, title: &str, body: &str) -> PostId {
        let id = PostId(Uuid::new_v4());
        self.posts.insert(
            id,
            DbPost {
                title: String::from(title),
                body: String::from(body),
                comments: Vec::new(),
            },
        );
        id
    }

    /// Return the current number of comments on `post`
    pub fn test_num_comments(&self, post: PostId) -> usize {
        self.posts.get(&post).map(|p| p.comments.len()).unwrap_or(0)
    }

    /// Panics if the comment cannot be created
    pub fn create_comment_for_test(
        &mut self,
        post: PostId,
        tok: AuthToken,
        message: &str,
        parent_id: Option<CommentId>,
    ) -> CommentId {
        self.create_comment(
            tok,
            NewComment {
                post_id: post,
                message: String::from(message),
                parent_id,
            },
        )
        .unwrap_or_else(|err| panic!("creating test comment {message:?}: {err}"))
        .id
    }

    /// Panics if the comment was already liked by this session's user
    pub fn like_for_test(&mut self, post: PostId, comment: CommentId, tok: AuthToken) {
        let toggled = self
            .toggle_comment_like(tok, CommentRef { post_id: post, id: comment })
            .unwrap_or_else(|err| panic!("liking test comment {comment:?}: {err}"));
        assert!(toggled.add_like, "test comment {comment:?} was already liked");
    }

    fn resolve(&self, tok: AuthToken) -> Result<UserId, Error> {
        self.sessions
            .get(&tok)
            .copied()
            .ok_or_else(|| Error::PermissionDenied(String::from("unknown session")))
    }

    fn post(&self, id: PostId) -> Result<&DbPost, Error> {
        self.posts.get(&id).ok_or(Error::PostNotFound(id))
    }

    fn post_mut(&mut self, id: PostId) -> Result<&mut DbPost, Error> {
        self.posts.get_mut(&id).ok_or(Error::PostNotFound(id))
    }

    /// Strictly increasing, so that comments are never created at the same time
    fn tick(&mut self) -> Time {
        self.clock = self.clock + chrono::Duration::seconds(1);
        self.clock
    }

    fn view(&self, c: &DbComment, viewer: UserId) -> Comment {
        Comment {
            id: c.id,
            message: c.message.clone(),
            parent_id: c.parent_id,
            created_at: c.created_at,
            user: User {
                id: c.owner,
                name: self
                    .users
                    .get(&c.owner)
                    .map(|u| u.name.clone())
                    .unwrap_or_default(),
            },
            like_count: c.likes.len() as u64,
            liked_by_me: c.likes.contains(&viewer),
        }
    }

    pub fn list_posts(&self, tok: AuthToken) -> Result<Vec<PostSummary>, Error> {
        self.resolve(tok)?;
        Ok(self
            .posts
            .iter()
            .map(|(id, p)| PostSummary {
                id: *id,
                title: p.title.clone(),
            })
            .collect())
    }

    pub fn fetch_post(&self, tok: AuthToken, id: PostId) -> Result<Post, Error> {
        let viewer = self.resolve(tok)?;
        let p = self.post(id)?;
        let mut comments = p
            .comments
            .iter()
            .map(|c| self.view(c, viewer))
            .collect::<Vec<_>>();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Post {
            id,
            title: p.title.clone(),
            body: p.body.clone(),
            comments,
        })
    }

    pub fn create_comment(&mut self, tok: AuthToken, c: NewComment) -> Result<Comment, Error> {
        let viewer = self.resolve(tok)?;
        api::validate_message(&c.message)?;
        let now = self.tick();
        let post = self.post_mut(c.post_id)?;
        if let Some(parent) = &c.parent_id {
            post.comment(parent)?;
        }
        let comment = DbComment {
            id: CommentId(Uuid::new_v4()),
            message: c.message,
            parent_id: c.parent_id,
            created_at: now,
            owner: viewer,
            likes: HashSet::new(),
        };
        let res = self.view(&comment, viewer);
        self.post_mut(c.post_id)?.comments.push(comment);
        Ok(res)
    }

    pub fn update_comment(&mut self, tok: AuthToken, e: EditComment) -> Result<EditedComment, Error> {
        let viewer = self.resolve(tok)?;
        api::validate_message(&e.message)?;
        let comment = self.post_mut(e.post_id)?.comment_mut(&e.id)?;
        if comment.owner != viewer {
            return Err(Error::PermissionDenied(String::from(
                "You don't have permission to edit this comment",
            )));
        }
        comment.message = e.message;
        Ok(EditedComment {
            message: comment.message.clone(),
        })
    }

    /// Also deletes all replies to the comment, recursively
    pub fn delete_comment(&mut self, tok: AuthToken, c: CommentRef) -> Result<DeletedComment, Error> {
        let viewer = self.resolve(tok)?;
        let post = self.post_mut(c.post_id)?;
        if post.comment(&c.id)?.owner != viewer {
            return Err(Error::PermissionDenied(String::from(
                "You don't have permission to delete this comment",
            )));
        }
        let mut doomed = HashSet::new();
        doomed.insert(c.id);
        loop {
            let before = doomed.len();
            for comment in post.comments.iter() {
                if matches!(comment.parent_id, Some(p) if doomed.contains(&p)) {
                    doomed.insert(comment.id);
                }
            }
            if doomed.len() == before {
                break;
            }
        }
        post.comments.retain(|comment| !doomed.contains(&comment.id));
        Ok(DeletedComment { id: c.id })
    }

    pub fn toggle_comment_like(&mut self, tok: AuthToken, c: CommentRef) -> Result<LikeToggled, Error> {
        let viewer = self.resolve(tok)?;
        let comment = self.post_mut(c.post_id)?.comment_mut(&c.id)?;
        let add_like = !comment.likes.remove(&viewer);
        if add_like {
            comment.likes.insert(viewer);
        }
        Ok(LikeToggled { add_like })
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

/// Shares a `MockServer` between concurrent callers, as a `CommentService`
pub struct MockService(Mutex<MockServer>);

impl MockService {
    pub fn new(server: MockServer) -> MockService {
        MockService(Mutex::new(server))
    }

    /// Direct access to the server, for test setup and inspection
    pub fn server(&self) -> MutexGuard<'_, MockServer> {
        self.0.lock()
    }
}

#[async_trait]
impl CommentService for MockService {
    async fn list_posts(&self, viewer: &AuthToken) -> Result<Vec<PostSummary>, Error> {
        self.0.lock().list_posts(*viewer)
    }

    async fn fetch_post(&self, viewer: &AuthToken, post: PostId) -> Result<Post, Error> {
        self.0.lock().fetch_post(*viewer, post)
    }

    async fn create_comment(&self, viewer: &AuthToken, c: NewComment) -> Result<Comment, Error> {
        self.0.lock().create_comment(*viewer, c)
    }

    async fn update_comment(
        &self,
        viewer: &AuthToken,
        e: EditComment,
    ) -> Result<EditedComment, Error> {
        self.0.lock().update_comment(*viewer, e)
    }

    async fn delete_comment(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<DeletedComment, Error> {
        self.0.lock().delete_comment(*viewer, c)
    }

    async fn toggle_comment_like(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<LikeToggled, Error> {
        let res = self.0.lock().toggle_comment_like(*viewer, c);
        if let Ok(t) = &res {
            tracing::debug!(comment = ?c.id, add_like = t.add_like, "toggled like");
        }
        res
    }
}
