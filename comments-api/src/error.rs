use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

use crate::{CommentId, PostId};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Message is required")]
    MessageRequired,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Post not found {0:?}")]
    PostNotFound(PostId),

    #[error("Comment not found {0:?}")]
    CommentNotFound(CommentId),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MessageRequired | Error::NullByteInString(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::PermissionDenied(_))
    }

    /// A not-found error on a mutation usually means the target was deleted
    /// concurrently, and is a reconciliation signal rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PostNotFound(_) | Error::CommentNotFound(_))
    }

    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Network(_) => StatusCode::BAD_GATEWAY,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::MessageRequired => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::PostNotFound(_) => StatusCode::NOT_FOUND,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::Network(msg) => json!({
                "message": msg,
                "type": "network",
            }),
            Error::PermissionDenied(msg) => json!({
                "message": msg,
                "type": "permission-denied",
            }),
            Error::MessageRequired => json!({
                "message": "Message is required",
                "type": "message-required",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::PostNotFound(id) => json!({
                "message": "post not found",
                "type": "post-not-found",
                "uuid": id.0,
            }),
            Error::CommentNotFound(id) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "uuid": id.0,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        let uuid = || {
            data.get("uuid")
                .and_then(|uuid| uuid.as_str())
                .and_then(|uuid| Uuid::from_str(uuid).ok())
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "network" => Error::Network(message()),
                "permission-denied" => Error::PermissionDenied(message()),
                "message-required" => Error::MessageRequired,
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "post-not-found" => Error::PostNotFound(PostId(
                    uuid().ok_or_else(|| anyhow!("error is a missing post without a uuid"))?,
                )),
                "comment-not-found" => Error::CommentNotFound(CommentId(
                    uuid().ok_or_else(|| anyhow!("error is a missing comment without a uuid"))?,
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
