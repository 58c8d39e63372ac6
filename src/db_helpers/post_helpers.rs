use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::PostData;
use crate::errors::RequestError;
use crate::models::{Post, PostListing};
use crate::pagination::{Page, Paginator, PAGE_SIZE};

const POST_LISTING_QUERY: &str = r#"
            SELECT posts.id                      AS "id",
                   posts.title                   AS "title",
                   posts.text                    AS "text",
                   posts.pub_date                AS "pub_date",
                   posts.author_id               AS "author_id",
                   posts.image                   AS "image",
                   posts.is_published            AS "is_published",
                   posts.created_at              AS "created_at",
                   users.username                AS "author_username",
                   users.first_name              AS "author_first_name",
                   users.last_name               AS "author_last_name",
                   categories.title              AS "category_title",
                   categories.slug               AS "category_slug",
                   categories.description        AS "category_description",
                   categories.is_published       AS "category_is_published",
                   locations.name                AS "location_name",
                   locations.is_published        AS "location_is_published",
                   (SELECT Count(comments.id)
                    FROM   comments
                    WHERE  comments.post_id = posts.id) AS "comment_count"
            FROM   posts
                JOIN users
                    ON users.id = posts.author_id
                LEFT JOIN categories
                        ON categories.id = posts.category_id
                LEFT JOIN locations
                        ON locations.id = posts.location_id
"#;

const POST_COUNT_QUERY: &str = r#"
            SELECT Count(posts.id)
            FROM   posts
                LEFT JOIN categories
                        ON categories.id = posts.category_id
"#;

// $3 switches the visibility rule on; $4 is the current time.
const POST_FILTER: &str = r#"
            WHERE  ( posts.author_id = $1
                    OR $1 IS NULL )
                AND ( posts.category_id = $2
                        OR $2 IS NULL )
                AND ( $3 = 0
                        OR ( posts.is_published = 1
                            AND Julianday(posts.pub_date) <= Julianday($4)
                            AND ( categories.id IS NULL
                                    OR categories.is_published = 1 ) ) )
"#;

const POST_COLUMNS: &str = "id, title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at";

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    pub only_visible: bool,
}

impl PostFilter {
    /// Every publicly visible post, for the index page.
    pub fn published() -> Self {
        PostFilter {
            only_visible: true,
            ..Default::default()
        }
    }

    pub fn category(category_id: i64) -> Self {
        PostFilter {
            category_id: Some(category_id),
            only_visible: true,
            ..Default::default()
        }
    }

    /// Authors see all of their own posts, everybody else only the visible ones.
    pub fn profile(author_id: i64, viewer: Option<i64>) -> Self {
        PostFilter {
            author_id: Some(author_id),
            category_id: None,
            only_visible: viewer != Some(author_id),
        }
    }
}

/// Newest `pub_date` first, one page of `PAGE_SIZE`.
pub async fn list_posts_in_db(
    pool: &SqlitePool,
    filter: PostFilter,
    page: Option<&str>,
) -> Result<Page<PostListing>, RequestError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let count_query = format!("{POST_COUNT_QUERY} {POST_FILTER}");
    let count = sqlx::query_scalar::<Sqlite, i64>(&count_query)
        .bind(filter.author_id)
        .bind(filter.category_id)
        .bind(filter.only_visible)
        .bind(now)
        .fetch_one(&mut tx)
        .await?;

    let window = Paginator::new(count, PAGE_SIZE).get_page(page);

    let list_query = format!(
        "{POST_LISTING_QUERY} {POST_FILTER} ORDER BY Julianday(posts.pub_date) DESC, posts.id DESC LIMIT $5 OFFSET $6"
    );
    let posts = sqlx::query_as::<Sqlite, PostListing>(&list_query)
        .bind(filter.author_id)
        .bind(filter.category_id)
        .bind(filter.only_visible)
        .bind(now)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&mut tx)
        .await?;

    tx.commit().await?;
    Ok(Page::new(posts, window))
}

pub async fn get_post_listing_in_db(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<PostListing>, RequestError> {
    let query = format!("{POST_LISTING_QUERY} WHERE posts.id = $1");
    let result = sqlx::query_as::<Sqlite, PostListing>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_post_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Post>, RequestError> {
    let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
    let result = sqlx::query_as::<Sqlite, Post>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn create_post_in_db(
    pool: &SqlitePool,
    author_id: i64,
    post: &PostData,
) -> Result<Post, RequestError> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(&post.title)
    .bind(&post.text)
    .bind(post.pub_date)
    .bind(author_id)
    .bind(post.location_id)
    .bind(post.category_id)
    .bind(&post.image)
    .bind(post.is_published)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    match get_post_by_id(pool, result.last_insert_rowid()).await? {
        Some(post) => Ok(post),
        None => Err(RequestError::ServerError),
    }
}

/// The author never changes on update.
pub async fn update_post_in_db(
    pool: &SqlitePool,
    id: i64,
    post: &PostData,
) -> Result<Post, RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET title = $1, text = $2, pub_date = $3, location_id = $4, category_id = $5, image = $6, is_published = $7
        WHERE id = $8
        "#,
    )
    .bind(&post.title)
    .bind(&post.text)
    .bind(post.pub_date)
    .bind(post.location_id)
    .bind(post.category_id)
    .bind(&post.image)
    .bind(post.is_published)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Post not found"));
    }

    match get_post_by_id(pool, id).await? {
        Some(post) => Ok(post),
        None => Err(RequestError::NotFound("Post not found")),
    }
}

/// Removes the post together with its comments.
pub async fn delete_post_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;

    sqlx::query(r#"DELETE FROM comments WHERE post_id = $1"#)
        .bind(id)
        .execute(&mut tx)
        .await?;

    let result = sqlx::query(r#"DELETE FROM posts WHERE id = $1"#)
        .bind(id)
        .execute(&mut tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Post not found"));
    }

    tx.commit().await?;
    Ok(())
}
