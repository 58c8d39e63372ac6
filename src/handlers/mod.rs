use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::RequestError;

mod comment_handlers;
mod post_handlers;
mod user_handlers;

pub use comment_handlers::*;
pub use post_handlers::*;
pub use user_handlers::*;

type JsonResult<T> = Result<Json<T>, RequestError>;
type HandlerResult = Result<Response, RequestError>;

/// Numeric ids from the URL. A segment that does not parse is a missing page,
/// not a bad request.
pub struct IdPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for IdPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(IdPath(value)),
            Err(rejection) => {
                tracing::debug!(path = %parts.uri.path(), %rejection, "unparsable id");
                Err(RequestError::NotFound("Page not found"))
            }
        }
    }
}

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("URL {} provided was not found", uri),
    )
}

fn redirect_to_post(post_id: i64) -> Response {
    Redirect::to(&format!("/posts/{post_id}")).into_response()
}

fn redirect_to_profile(username: &str) -> Response {
    Redirect::to(&format!("/profile/{}", urlencoding::encode(username))).into_response()
}
