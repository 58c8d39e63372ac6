use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::{
    data_formats::{NewUser, ProfileData},
    errors::RequestError,
    models::User,
};

use super::get_user_by_id;

/// `user.password` must already be hashed.
pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<User, RequestError> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password, date_joined)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    match get_user_by_id(pool, result.last_insert_rowid()).await? {
        Some(user) => Ok(user),
        None => Err(RequestError::ServerError),
    }
}

pub async fn update_user_in_db(
    pool: &SqlitePool,
    id: i64,
    ProfileData {
        username,
        email,
        first_name,
        last_name,
    }: ProfileData,
) -> Result<User, RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET username = $1, email = $2, first_name = $3, last_name = $4
        WHERE id = $5
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("User not found"));
    }

    match get_user_by_id(pool, id).await? {
        Some(user) => Ok(user),
        None => Err(RequestError::NotFound("User not found")),
    }
}

/// `exclude` is the user being edited, whose own name does not count.
pub async fn username_taken(
    pool: &SqlitePool,
    username: &str,
    exclude: Option<i64>,
) -> Result<bool, RequestError> {
    let taken = sqlx::query_scalar::<Sqlite, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND ( id != $2 OR $2 IS NULL ))
        "#,
    )
    .bind(username)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

/// Blank emails are never considered taken.
pub async fn email_taken(
    pool: &SqlitePool,
    email: &str,
    exclude: Option<i64>,
) -> Result<bool, RequestError> {
    if email.is_empty() {
        return Ok(false);
    }
    let taken = sqlx::query_scalar::<Sqlite, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND ( id != $2 OR $2 IS NULL ))
        "#,
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}
