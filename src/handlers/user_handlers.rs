use std::sync::Arc;

use axum::{
    extract::Query,
    response::{IntoResponse, Redirect},
    Extension, Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use sqlx::SqlitePool;

use crate::{
    authentication::{
        expired_session_cookie, get_jwt_token, hash_password_argon2, session_cookie,
        verify_password_argon2, RequireUser,
    },
    config::Config,
    data_formats::{
        FormWrapper, LoginForm, LoginQueryParams, RegistrationForm, UserEditForm,
        BAD_CREDENTIALS, EMAIL_TAKEN, REQUIRED, USERNAME_TAKEN,
    },
    db_helpers::{
        email_taken, get_user_by_id, get_user_by_username, insert_user, unique_violation_field,
        update_user_in_db, username_taken,
    },
    errors::{FormErrors, RequestError, NON_FIELD_ERRORS},
};

use super::{redirect_to_profile, HandlerResult, JsonResult};

type UserEditJson = FormWrapper<UserEditForm>;
type RegistrationJson = FormWrapper<RegistrationForm>;
type LoginJson = FormWrapper<LoginForm>;

/// Username and email must not belong to anybody but `exclude`.
async fn uniqueness_errors(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    exclude: Option<i64>,
) -> Result<FormErrors, RequestError> {
    let mut errors = FormErrors::new();
    if !username.is_empty() && username_taken(pool, username, exclude).await? {
        errors.add("username", USERNAME_TAKEN);
    }
    if email_taken(pool, email.trim(), exclude).await? {
        errors.add("email", EMAIL_TAKEN);
    }
    Ok(errors)
}

/// Turns a unique constraint failure on insert/update into an error on the
/// field it concerns. Other errors pass through.
fn conflict_to_form_error<T: serde::Serialize>(form: &T, error: RequestError) -> RequestError {
    let mut errors = FormErrors::new();
    match unique_violation_field(&error) {
        Some("email") => errors.add("email", EMAIL_TAKEN),
        Some("username") => errors.add("username", USERNAME_TAKEN),
        _ => return error,
    }
    RequestError::invalid_form(form, errors)
}

// ----------------- Registration Handlers -----------------
pub async fn registration_form() -> JsonResult<RegistrationJson> {
    Ok(Json(FormWrapper::wrap_with_form_data(
        RegistrationForm::default(),
    )))
}

pub async fn registration(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Form(form): Form<RegistrationForm>,
) -> HandlerResult {
    let mut errors = uniqueness_errors(&pool, &form.username, &form.email, None).await?;
    let cleaned = form.clean().map_err(|e| errors.merge(e)).ok();
    let mut user = match cleaned {
        Some(user) if errors.is_empty() => user,
        _ => return Err(RequestError::invalid_form(&form, errors)),
    };

    user.password = hash_password_argon2(user.password).await.map_err(|e| {
        tracing::error!(error = %e, "could not hash password");
        RequestError::ServerError
    })?;

    let user = insert_user(&pool, &user)
        .await
        .map_err(|e| conflict_to_form_error(&form, e))?;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Redirect::to("/auth/login").into_response())
}

// ----------------- Session Handlers -----------------
pub async fn login_form() -> JsonResult<LoginJson> {
    Ok(Json(FormWrapper::wrap_with_form_data(LoginForm::default())))
}

pub async fn login(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    Query(params): Query<LoginQueryParams>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> HandlerResult {
    let mut errors = FormErrors::new();
    if form.username.is_empty() {
        errors.add("username", REQUIRED);
    }
    if form.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    errors
        .into_result()
        .map_err(|errors| RequestError::invalid_form(&form, errors))?;

    let user = get_user_by_username(&pool, &form.username).await?;
    let user = match user {
        Some(user) => {
            let is_password_correct = verify_password_argon2(form.password.clone(), &user.password)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "could not verify password");
                    RequestError::ServerError
                })?;
            is_password_correct.then_some(user)
        }
        None => None,
    };
    let user = match user {
        Some(user) => user,
        None => {
            let mut errors = FormErrors::new();
            errors.add(NON_FIELD_ERRORS, BAD_CREDENTIALS);
            return Err(RequestError::invalid_form(&form, errors));
        }
    };

    let token = get_jwt_token(user.id, &config).map_err(|e| {
        tracing::error!(error = %e, "could not issue session token");
        RequestError::ServerError
    })?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok((
        jar.add(session_cookie(token, &config)),
        Redirect::to(params.redirect_target()),
    )
        .into_response())
}

pub async fn logout(jar: CookieJar) -> HandlerResult {
    Ok((jar.add(expired_session_cookie()), Redirect::to("/")).into_response())
}

// ----------------- Profile Handlers -----------------
pub async fn edit_profile_form(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
) -> JsonResult<UserEditJson> {
    let user = get_user_by_id(&pool, user.id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    Ok(Json(FormWrapper::wrap_with_form_data(
        UserEditForm::from_user(&user),
    )))
}

pub async fn edit_profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    RequireUser(user): RequireUser,
    Form(form): Form<UserEditForm>,
) -> HandlerResult {
    let mut errors = uniqueness_errors(&pool, &form.username, &form.email, Some(user.id)).await?;
    let cleaned = form.clean().map_err(|e| errors.merge(e)).ok();
    let profile = match cleaned {
        Some(profile) if errors.is_empty() => profile,
        _ => return Err(RequestError::invalid_form(&form, errors)),
    };

    let updated = update_user_in_db(&pool, user.id, profile)
        .await
        .map_err(|e| conflict_to_form_error(&form, e))?;
    tracing::info!(user_id = updated.id, username = %updated.username, "profile updated");
    Ok(redirect_to_profile(&updated.username))
}
