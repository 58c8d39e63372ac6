use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Redirect},
    Extension, Form, Json,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    authentication::{MaybeUser, RequireUser},
    data_formats::{
        CategoryPostsWrapper, CategoryResponse, ChoiceResponse, CommentForm, CommentResponse,
        IndexWrapper, PostData, PostDetailWrapper, PostForm, PostFormWrapper, PostResponse,
        ProfileResponse, ProfileWrapper, INVALID_CHOICE,
    },
    db_helpers::{
        category_exists, create_post_in_db, delete_post_in_db, get_post_by_id,
        get_post_listing_in_db, get_published_category_by_slug, get_user_by_username,
        list_categories_in_db, list_comments_for_post_in_db, list_locations_in_db,
        list_posts_in_db, location_exists, update_post_in_db, PostFilter,
    },
    errors::{FormErrors, RequestError},
    models::{Authored, Post},
    pagination::PageQueryParams,
};

use super::{redirect_to_post, redirect_to_profile, HandlerResult, IdPath, JsonResult};

type PostFormJson = PostFormWrapper<PostForm>;

// ----------------- Listing Handlers -----------------
pub async fn index(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Query(params): Query<PageQueryParams>,
) -> JsonResult<IndexWrapper> {
    let page = list_posts_in_db(&pool, PostFilter::published(), params.page.as_deref()).await?;
    Ok(Json(IndexWrapper {
        page_obj: page.map(PostResponse::new),
    }))
}

pub async fn category_posts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(category_slug): Path<String>,
    Query(params): Query<PageQueryParams>,
) -> JsonResult<CategoryPostsWrapper> {
    let category = get_published_category_by_slug(&pool, &category_slug)
        .await?
        .ok_or(RequestError::NotFound("Category not found"))?;
    let page = list_posts_in_db(
        &pool,
        PostFilter::category(category.id),
        params.page.as_deref(),
    )
    .await?;
    Ok(Json(CategoryPostsWrapper {
        category: CategoryResponse::new(category),
        page_obj: page.map(PostResponse::new),
    }))
}

pub async fn profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PageQueryParams>,
) -> JsonResult<ProfileWrapper> {
    let profile_user = get_user_by_username(&pool, &username)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    let filter = PostFilter::profile(profile_user.id, maybe_user.get_id());
    let page = list_posts_in_db(&pool, filter, params.page.as_deref()).await?;
    Ok(Json(ProfileWrapper {
        profile: ProfileResponse::new(profile_user),
        page_obj: page.map(PostResponse::new),
    }))
}

pub async fn post_detail(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    IdPath(post_id): IdPath<i64>,
) -> HandlerResult {
    let post = get_post_listing_in_db(&pool, post_id)
        .await?
        .ok_or(RequestError::NotFound("Post not found"))?;

    if !post.is_visible_to(maybe_user.get_id(), Utc::now()) {
        return Ok(Redirect::to("/").into_response());
    }

    let comments = list_comments_for_post_in_db(&pool, post_id)
        .await?
        .into_iter()
        .map(CommentResponse::new)
        .collect();
    Ok(Json(PostDetailWrapper {
        post: PostResponse::new(post),
        comments,
        form: CommentForm::default(),
    })
    .into_response())
}

// ----------------- Post Form Handlers -----------------
async fn find_post(pool: &SqlitePool, post_id: i64) -> Result<Post, RequestError> {
    get_post_by_id(pool, post_id)
        .await?
        .ok_or(RequestError::NotFound("Post not found"))
}

async fn post_form_response(
    pool: &SqlitePool,
    form: PostForm,
) -> Result<Json<PostFormJson>, RequestError> {
    let categories = list_categories_in_db(pool)
        .await?
        .into_iter()
        .map(ChoiceResponse::from)
        .collect();
    let locations = list_locations_in_db(pool)
        .await?
        .into_iter()
        .map(ChoiceResponse::from)
        .collect();
    Ok(Json(PostFormWrapper {
        form,
        errors: FormErrors::new(),
        categories,
        locations,
    }))
}

/// Form checks plus the ones that need the database: the chosen category and
/// location must exist.
async fn clean_post_form(
    pool: &SqlitePool,
    form: &PostForm,
    default_published: bool,
) -> Result<PostData, RequestError> {
    let data = form
        .clean(default_published)
        .map_err(|errors| RequestError::invalid_form(form, errors))?;

    let mut errors = FormErrors::new();
    if let Some(category_id) = data.category_id {
        if !category_exists(pool, category_id).await? {
            errors.add("category", INVALID_CHOICE);
        }
    }
    if let Some(location_id) = data.location_id {
        if !location_exists(pool, location_id).await? {
            errors.add("location", INVALID_CHOICE);
        }
    }
    errors
        .into_result()
        .map_err(|errors| RequestError::invalid_form(form, errors))?;
    Ok(data)
}

pub async fn create_post_form(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(_): RequireUser,
) -> JsonResult<PostFormJson> {
    post_form_response(&pool, PostForm::default()).await
}

pub async fn create_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    Form(form): Form<PostForm>,
) -> HandlerResult {
    let data = clean_post_form(&pool, &form, true).await?;
    let post = create_post_in_db(&pool, user.id, &data).await?;
    tracing::info!(post_id = post.id, author = %user.username, "post created");
    Ok(redirect_to_profile(&user.username))
}

pub async fn edit_post_form(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath(post_id): IdPath<i64>,
) -> HandlerResult {
    let post = find_post(&pool, post_id).await?;
    if !post.is_authored_by(user.id) {
        return Ok(redirect_to_post(post_id));
    }
    Ok(post_form_response(&pool, PostForm::from_post(&post))
        .await?
        .into_response())
}

pub async fn edit_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath(post_id): IdPath<i64>,
    Form(form): Form<PostForm>,
) -> HandlerResult {
    let post = find_post(&pool, post_id).await?;
    if !post.is_authored_by(user.id) {
        tracing::debug!(post_id, user_id = user.id, "edit by non-author ignored");
        return Ok(redirect_to_post(post_id));
    }
    let data = clean_post_form(&pool, &form, post.is_published).await?;
    update_post_in_db(&pool, post_id, &data).await?;
    tracing::info!(post_id, "post updated");
    Ok(redirect_to_post(post_id))
}

pub async fn delete_post_form(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath(post_id): IdPath<i64>,
) -> HandlerResult {
    let post = find_post(&pool, post_id).await?;
    if !post.is_authored_by(user.id) {
        return Ok(redirect_to_post(post_id));
    }
    Ok(post_form_response(&pool, PostForm::from_post(&post))
        .await?
        .into_response())
}

pub async fn delete_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    IdPath(post_id): IdPath<i64>,
) -> HandlerResult {
    let post = find_post(&pool, post_id).await?;
    if !post.is_authored_by(user.id) {
        tracing::debug!(post_id, user_id = user.id, "delete by non-author ignored");
        return Ok(redirect_to_post(post_id));
    }
    delete_post_in_db(&pool, post_id).await?;
    tracing::info!(post_id, "post deleted");
    Ok(redirect_to_profile(&user.username))
}
