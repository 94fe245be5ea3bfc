use uuid::Uuid;

/// Opaque identity of the current viewer.
///
/// Every call to a `CommentService` carries one explicitly; the service
/// resolves it to a user and scopes ownership checks and like status to it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AuthToken(pub Uuid);
