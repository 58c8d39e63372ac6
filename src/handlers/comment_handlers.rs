use std::sync::Arc;

use axum::{response::IntoResponse, Extension, Form, Json};
use sqlx::SqlitePool;

use crate::{
    authentication::RequireUser,
    data_formats::{CommentForm, CommentResponse, CommentWrapper},
    db_helpers::{
        add_comment_in_db, delete_comment_in_db, get_comment_in_db, get_post_by_id,
        update_comment_in_db,
    },
    errors::RequestError,
    models::{Authored, CommentListing},
};

use super::{redirect_to_post, HandlerResult, IdPath};

async fn find_comment(
    pool: &SqlitePool,
    post_id: i64,
    comment_id: i64,
) -> Result<CommentListing, RequestError> {
    get_comment_in_db(pool, post_id, comment_id)
        .await?
        .ok_or(RequestError::NotFound("Comment not found"))
}

fn comment_view(comment: CommentListing) -> HandlerResult {
    let form = CommentForm::from_comment(&comment);
    Ok(Json(CommentWrapper {
        comment: CommentResponse::new(comment),
        form,
    })
    .into_response())
}

pub async fn add_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath(post_id): IdPath<i64>,
    Form(form): Form<CommentForm>,
) -> HandlerResult {
    if get_post_by_id(&pool, post_id).await?.is_none() {
        return Err(RequestError::NotFound("Post not found"));
    }
    let text = form
        .clean()
        .map_err(|errors| RequestError::invalid_form(&form, errors))?;
    let comment = add_comment_in_db(&pool, post_id, user.id, &text).await?;
    tracing::info!(post_id, comment_id = comment.id, "comment added");
    Ok(redirect_to_post(post_id))
}

pub async fn edit_comment_form(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath((post_id, comment_id)): IdPath<(i64, i64)>,
) -> HandlerResult {
    let comment = find_comment(&pool, post_id, comment_id).await?;
    if !comment.is_authored_by(user.id) {
        return Ok(redirect_to_post(post_id));
    }
    comment_view(comment)
}

pub async fn edit_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath((post_id, comment_id)): IdPath<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> HandlerResult {
    let comment = find_comment(&pool, post_id, comment_id).await?;
    if !comment.is_authored_by(user.id) {
        tracing::debug!(comment_id, user_id = user.id, "edit by non-author ignored");
        return Ok(redirect_to_post(post_id));
    }
    let text = form
        .clean()
        .map_err(|errors| RequestError::invalid_form(&form, errors))?;
    update_comment_in_db(&pool, comment.id, &text).await?;
    tracing::info!(post_id, comment_id, "comment updated");
    Ok(redirect_to_post(post_id))
}

pub async fn delete_comment_form(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath((post_id, comment_id)): IdPath<(i64, i64)>,
) -> HandlerResult {
    let comment = find_comment(&pool, post_id, comment_id).await?;
    if !comment.is_authored_by(user.id) {
        return Ok(redirect_to_post(post_id));
    }
    comment_view(comment)
}

pub async fn delete_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath((post_id, comment_id)): IdPath<(i64, i64)>,
) -> HandlerResult {
    let comment = find_comment(&pool, post_id, comment_id).await?;
    if !comment.is_authored_by(user.id) {
        tracing::debug!(comment_id, user_id = user.id, "delete by non-author ignored");
        return Ok(redirect_to_post(post_id));
    }
    delete_comment_in_db(&pool, comment.id).await?;
    tracing::info!(post_id, comment_id, "comment deleted");
    Ok(redirect_to_post(post_id))
}
