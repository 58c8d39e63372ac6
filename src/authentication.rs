use std::sync::Arc;

use crate::config::Config;
use crate::db_helpers::get_user_by_id;
use crate::errors::RequestError;
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
struct AuthClaim {
    id: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// The viewer of a page: anonymous or a logged in user.
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|a| a.id)
    }
}

/// A logged in user. Anonymous requests are sent to the login page.
pub struct RequireUser(pub AuthUser);

enum TokenSource {
    Header(String),
    Cookie(String),
}

fn find_token(headers: &HeaderMap) -> Result<Option<TokenSource>, RequestError> {
    if let Some(header) = headers.get(header::AUTHORIZATION) {
        let header = header.to_str().map_err(|_| {
            tracing::warn!("authorization header is not valid ascii");
            RequestError::NotAuthorized("Invalid token")
        })?;
        let token = header.strip_prefix("Token ").ok_or_else(|| {
            tracing::warn!("authorization header without Token prefix");
            RequestError::NotAuthorized("Invalid token")
        })?;
        return Ok(Some(TokenSource::Header(token.to_owned())));
    }
    let token = CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty());
    Ok(token.map(TokenSource::Cookie))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<Arc<Config>>()
            .cloned()
            .ok_or(RequestError::ServerError)?;
        let pool = parts
            .extensions
            .get::<Arc<SqlitePool>>()
            .cloned()
            .ok_or(RequestError::ServerError)?;

        let id = match find_token(&parts.headers)? {
            None => return Ok(MaybeUser(None)),
            Some(TokenSource::Header(token)) => verify_jwt_token(&token, &config)?,
            // A stale cookie only means the browser has to log in again.
            Some(TokenSource::Cookie(token)) => match verify_jwt_token(&token, &config) {
                Ok(id) => id,
                Err(_) => return Ok(MaybeUser(None)),
            },
        };

        let user = match get_user_by_id(&pool, id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = id, "token for a user that no longer exists");
                return Ok(MaybeUser(None));
            }
        };

        Ok(MaybeUser(Some(AuthUser {
            id: user.id,
            username: user.username,
        })))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(RequireUser(user)),
            MaybeUser(None) => Err(RequestError::LoginRequired(parts.uri.path().to_string())),
        }
    }
}

pub fn get_jwt_token(id: i64, config: &Config) -> Result<String> {
    let expiry_date = OffsetDateTime::now_utc() + config.token_expiry();
    let claim = AuthClaim {
        id,
        exp: expiry_date.unix_timestamp(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claim,
        &jsonwebtoken::EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .context("Failed to generate jwt token")
}

pub fn verify_jwt_token(token: &str, config: &Config) -> Result<i64, RequestError> {
    let token_data = jsonwebtoken::decode::<AuthClaim>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &jsonwebtoken::Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "rejected session token");
        RequestError::NotAuthorized("Invalid Token")
    })?;
    let claim = token_data.claims;
    if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
        return Err(RequestError::NotAuthorized("Token expired"));
    }
    Ok(claim.id)
}

pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(config.token_expiry())
        .finish()
}

/// Overwrites the session cookie with an empty one that expires at once.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .finish()
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to verify password"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}
