use uuid::Uuid;

use crate::Comment;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
}

/// A post together with all its comments, flat, as seen by one viewer
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub body: String,

    /// Only used to seed a client-side store, newest first
    pub comments: Vec<Comment>,
}
