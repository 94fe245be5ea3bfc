use async_trait::async_trait;
use comments_api::{
    AuthToken, Comment, CommentId, CommentRef, CommentService, DeletedComment, EditComment,
    EditedComment, Error, LikeToggled, NewComment, Post, PostId, PostSummary,
};
use reqwest::StatusCode;

/// `CommentService` talking JSON over HTTP, authenticating with a bearer token
pub struct HttpService {
    client: reqwest::Client,
    host: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCommentBody<'a> {
    message: &'a str,
    parent_id: Option<CommentId>,
}

#[derive(serde::Serialize)]
struct EditCommentBody<'a> {
    message: &'a str,
}

impl HttpService {
    pub fn new(host: String) -> HttpService {
        HttpService {
            client: reqwest::Client::new(),
            host,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path)
    }

    fn comments_url(&self, post: &PostId) -> String {
        self.url(&format!("post/{}/comments", post.0))
    }

    fn comment_url(&self, c: &CommentRef) -> String {
        self.url(&format!("post/{}/comments/{}", c.post_id.0, c.id.0))
    }

    /// `not_found` is the error a 404 stands for, if the request has a target
    async fn call<R>(
        &self,
        req: reqwest::RequestBuilder,
        viewer: &AuthToken,
        not_found: Option<Error>,
    ) -> Result<R, Error>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let resp = req
            .bearer_auth(viewer.0)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return resp
                .json()
                .await
                .map_err(|e| Error::Unknown(format!("failed parsing server answer: {e}")));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Err(error_from_response(status, &body, not_found))
    }
}

/// Recovers an `Error` from a failed response.
///
/// Bodies produced by `Error::contents` are parsed back as is. Other servers
/// answer `{statusCode, error, message}`, classified from the status code.
fn error_from_response(status: StatusCode, body: &[u8], not_found: Option<Error>) -> Error {
    if let Ok(err) = Error::parse(body) {
        return err;
    }
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(String::from))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    match (status, not_found) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Error::PermissionDenied(message),
        (StatusCode::BAD_REQUEST, _) if message == "Message is required" => Error::MessageRequired,
        (StatusCode::NOT_FOUND, Some(err)) => err,
        (status, _) => {
            tracing::warn!(%status, %message, "server returned an unclassified error");
            Error::Unknown(format!("server answered {status}: {message}"))
        }
    }
}

#[async_trait]
impl CommentService for HttpService {
    async fn list_posts(&self, viewer: &AuthToken) -> Result<Vec<PostSummary>, Error> {
        self.call(self.client.get(self.url("posts")), viewer, None)
            .await
    }

    async fn fetch_post(&self, viewer: &AuthToken, post: PostId) -> Result<Post, Error> {
        let req = self.client.get(self.url(&format!("post/{}", post.0)));
        self.call(req, viewer, Some(Error::PostNotFound(post))).await
    }

    async fn create_comment(&self, viewer: &AuthToken, c: NewComment) -> Result<Comment, Error> {
        let req = self
            .client
            .post(self.comments_url(&c.post_id))
            .json(&NewCommentBody {
                message: &c.message,
                parent_id: c.parent_id,
            });
        self.call(req, viewer, Some(Error::PostNotFound(c.post_id)))
            .await
    }

    async fn update_comment(
        &self,
        viewer: &AuthToken,
        e: EditComment,
    ) -> Result<EditedComment, Error> {
        let req = self
            .client
            .put(self.comment_url(&CommentRef {
                post_id: e.post_id,
                id: e.id,
            }))
            .json(&EditCommentBody {
                message: &e.message,
            });
        self.call(req, viewer, Some(Error::CommentNotFound(e.id)))
            .await
    }

    async fn delete_comment(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<DeletedComment, Error> {
        let req = self.client.delete(self.comment_url(&c));
        self.call(req, viewer, Some(Error::CommentNotFound(c.id)))
            .await
    }

    async fn toggle_comment_like(
        &self,
        viewer: &AuthToken,
        c: CommentRef,
    ) -> Result<LikeToggled, Error> {
        let url = format!("{}/toggleLike", self.comment_url(&c));
        self.call(self.client.post(url), viewer, Some(Error::CommentNotFound(c.id)))
            .await
    }
}
