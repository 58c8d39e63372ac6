use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::{
    errors::RequestError,
    models::{Comment, CommentListing},
};

const COMMENT_LISTING_QUERY: &str = r#"
        SELECT comments.id          AS "id",
               comments.text        AS "text",
               comments.post_id     AS "post_id",
               comments.author_id   AS "author_id",
               comments.created_at  AS "created_at",
               users.username       AS "author_username",
               users.first_name     AS "author_first_name",
               users.last_name      AS "author_last_name"
        FROM   comments
            JOIN users
                ON users.id = comments.author_id
"#;

pub async fn add_comment_in_db(
    pool: &SqlitePool,
    post_id: i64,
    author_id: i64,
    text: &str,
) -> Result<Comment, RequestError> {
    let result = sqlx::query_as::<Sqlite, Comment>(
        r#"
        INSERT INTO comments (text, post_id, author_id, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, text, post_id, author_id, created_at
        "#,
    )
    .bind(text)
    .bind(post_id)
    .bind(author_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(result)
}

/// Oldest first.
pub async fn list_comments_for_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<CommentListing>, RequestError> {
    let query = format!(
        "{COMMENT_LISTING_QUERY} WHERE comments.post_id = $1 ORDER BY comments.created_at ASC, comments.id ASC"
    );
    let result = sqlx::query_as::<Sqlite, CommentListing>(&query)
        .bind(post_id)
        .fetch_all(pool)
        .await?;
    Ok(result)
}

/// A comment only matches when it belongs to `post_id`.
pub async fn get_comment_in_db(
    pool: &SqlitePool,
    post_id: i64,
    comment_id: i64,
) -> Result<Option<CommentListing>, RequestError> {
    let query = format!("{COMMENT_LISTING_QUERY} WHERE comments.post_id = $1 AND comments.id = $2");
    let result = sqlx::query_as::<Sqlite, CommentListing>(&query)
        .bind(post_id)
        .bind(comment_id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn update_comment_in_db(
    pool: &SqlitePool,
    comment_id: i64,
    text: &str,
) -> Result<(), RequestError> {
    let result = sqlx::query(r#"UPDATE comments SET text = $1 WHERE id = $2"#)
        .bind(text)
        .bind(comment_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Comment not found"));
    }
    Ok(())
}

pub async fn delete_comment_in_db(pool: &SqlitePool, comment_id: i64) -> Result<(), RequestError> {
    let result = sqlx::query(r#"DELETE FROM comments WHERE id = $1"#)
        .bind(comment_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Comment not found"));
    }
    Ok(())
}
