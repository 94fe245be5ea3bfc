use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeZone;
use comments_mock_server::{MockServer, MockService};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::api::{
    AuthToken, Comment, CommentId, CommentRef, CommentService, DeletedComment, EditComment,
    EditedComment, Error, LikeToggled, NewComment, Post, PostId, PostSummary, Time, User, UserId,
};

pub fn cid(n: u128) -> CommentId {
    CommentId(Uuid::from_u128(n))
}

pub fn post_id(n: u128) -> PostId {
    PostId(Uuid::from_u128(n))
}

pub fn time(secs: i64) -> Time {
    chrono::Utc
        .timestamp_opt(1_600_000_000 + secs, 0)
        .single()
        .expect("test timestamp out of range")
}

pub fn comment(id: u128, parent: Option<u128>, secs: i64) -> Comment {
    Comment {
        id: cid(id),
        message: format!("comment {id}"),
        parent_id: parent.map(cid),
        created_at: time(secs),
        user: User {
            id: UserId::stub(),
            name: String::from("Kyle"),
        },
        like_count: 0,
        liked_by_me: false,
    }
}

/// A mock server with one post and two users, `alice` and `bob`
pub struct Fixture {
    pub service: Arc<Gated<MockService>>,
    pub post: PostId,
    pub alice: AuthToken,
    pub bob: AuthToken,
}

pub fn fixture() -> Fixture {
    fixture_holding(false, false)
}

pub fn fixture_holding(hold_updates: bool, hold_toggles: bool) -> Fixture {
    let mut server = MockServer::new();
    let (_, alice) = server.create_user("alice");
    let (_, bob) = server.create_user("bob");
    let post = server.create_post("Title", "Body");
    Fixture {
        service: Arc::new(Gated {
            hold_updates,
            hold_toggles,
            ..Gated::new(MockService::new(server))
        }),
        post,
        alice,
        bob,
    }
}

/// Service wrapper that can hold back answers until released, to force the
/// order in which concurrent calls settle.
///
/// The wrapped call is always executed first: a held answer models a request
/// that the server already processed but whose response is still in flight.
pub struct Gated<S> {
    pub inner: S,
    pub hold_updates: bool,
    pub hold_toggles: bool,
    pub release: Notify,
    pub calls: parking_lot::Mutex<usize>,
}

impl<S> Gated<S> {
    pub fn new(inner: S) -> Gated<S> {
        Gated {
            inner,
            hold_updates: false,
            hold_toggles: false,
            release: Notify::new(),
            calls: parking_lot::Mutex::new(0),
        }
    }

    pub fn num_calls(&self) -> usize {
        *self.calls.lock()
    }

    fn count(&self) {
        *self.calls.lock() += 1;
    }
}

#[async_trait]
impl<S: CommentService> CommentService for Gated<S> {
    async fn list_posts(&self, viewer: &AuthToken) -> Result<Vec<PostSummary>, Error> {
        self.count();
        self.inner.list_posts(viewer).await
    }

    async fn fetch_post(&self, viewer: &AuthToken, post: PostId) -> Result<Post, Error> {
        self.count();
        self.inner.fetch_post(viewer, post).await
    }

    async fn create_comment(&self, viewer: &AuthToken, c: NewComment) -> Result<Comment, Error> {
        self.count();
        self.inner.create_comment(viewer, c).await
    }

    async fn update_comment(
        &self,
        viewer: &AuthToken,
        e: EditComment,
    ) -> Result<EditedComment, Error> {
        self.count();
        let res = self.inner.update_comment(viewer, e).await;
        if self.hold_updates {
            self.release.notified().await;
        }
        res
    }

    async fn delete_comment(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<DeletedComment, Error> {
        self.count();
        self.inner.delete_comment(viewer, c).await
    }

    async fn toggle_comment_like(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<LikeToggled, Error> {
        self.count();
        let res = self.inner.toggle_comment_like(viewer, c).await;
        if self.hold_toggles {
            self.release.notified().await;
        }
        res
    }
}
