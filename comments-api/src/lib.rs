use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod auth;
pub use auth::AuthToken;

mod comment;
pub use comment::{
    Comment, CommentId, CommentRef, DeletedComment, EditComment, EditedComment, LikeToggled,
    NewComment,
};

mod error;
pub use error::Error;

mod post;
pub use post::{Post, PostId, PostSummary};

mod service;
pub use service::CommentService;

mod user;
pub use user::{User, UserId};

/// Checks a comment message before it is sent anywhere.
///
/// Both the client and the server run this: the client so that an empty form
/// never reaches the network, the server because it cannot trust the client.
pub fn validate_message(message: &str) -> Result<(), Error> {
    if message.is_empty() {
        return Err(Error::MessageRequired);
    }
    validate_string(message)
}

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}
