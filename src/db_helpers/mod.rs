use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::User};

mod category_helpers;
mod comment_helpers;
mod post_helpers;
mod user_helpers;

pub use category_helpers::*;
pub use comment_helpers::*;
pub use post_helpers::*;
pub use user_helpers::*;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password, date_joined";

// ----------------- Helper Functions -----------------

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

/// Whether a row exists in `table` with `id`. Only called with table names
/// known at compile time.
async fn row_exists(pool: &SqlitePool, table: &'static str, id: i64) -> Result<bool, RequestError> {
    let query = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
    let exists = sqlx::query_scalar::<Sqlite, bool>(&query)
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// The `users` column named by a unique constraint failure, if `error` is one.
pub fn unique_violation_field(error: &RequestError) -> Option<&'static str> {
    let message = match error {
        RequestError::DatabaseError(sqlx::Error::Database(e)) => e.message(),
        _ => return None,
    };
    if !message.contains("UNIQUE constraint failed") {
        return None;
    }
    ["email", "username"]
        .into_iter()
        .find(|column| message.contains(&format!("users.{column}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, Utc};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::SqlitePool;
    use std::str::FromStr;

    use super::*;
    use crate::data_formats::{NewUser, PostData};
    use crate::models::{Category, Post};

    pub async fn test_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    pub async fn user(pool: &SqlitePool, username: &str) -> User {
        insert_user(
            pool,
            &NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: String::new(),
                last_name: String::new(),
                password: "not-a-real-hash".to_string(),
            },
        )
        .await
        .unwrap()
    }

    pub fn post_data(title: &str, pub_date: DateTime<Utc>) -> PostData {
        PostData {
            title: title.to_string(),
            text: "text".to_string(),
            pub_date,
            location_id: None,
            category_id: None,
            image: None,
            is_published: true,
        }
    }

    pub async fn post(pool: &SqlitePool, author: &User, title: &str) -> Post {
        create_post_in_db(pool, author.id, &post_data(title, Utc::now() - Duration::hours(1)))
            .await
            .unwrap()
    }

    pub async fn category(pool: &SqlitePool, slug: &str, is_published: bool) -> Category {
        insert_category(pool, slug, slug, "", is_published)
            .await
            .unwrap()
    }
}
