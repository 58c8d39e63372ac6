use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::{
    errors::RequestError,
    models::{Category, Location},
};

use super::row_exists;

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";
const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

/// Unpublished categories are treated as missing.
pub async fn get_published_category_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Category>, RequestError> {
    let query =
        format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1 AND is_published = 1");
    let result = sqlx::query_as::<Sqlite, Category>(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn category_exists(pool: &SqlitePool, id: i64) -> Result<bool, RequestError> {
    row_exists(pool, "categories", id).await
}

pub async fn location_exists(pool: &SqlitePool, id: i64) -> Result<bool, RequestError> {
    row_exists(pool, "locations", id).await
}

pub async fn list_categories_in_db(pool: &SqlitePool) -> Result<Vec<Category>, RequestError> {
    let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY title");
    let result = sqlx::query_as::<Sqlite, Category>(&query)
        .fetch_all(pool)
        .await?;
    Ok(result)
}

pub async fn list_locations_in_db(pool: &SqlitePool) -> Result<Vec<Location>, RequestError> {
    let query = format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY name");
    let result = sqlx::query_as::<Sqlite, Location>(&query)
        .fetch_all(pool)
        .await?;
    Ok(result)
}

pub async fn insert_category(
    pool: &SqlitePool,
    title: &str,
    slug: &str,
    description: &str,
    is_published: bool,
) -> Result<Category, RequestError> {
    let query = format!(
        "INSERT INTO categories (title, description, slug, is_published, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING {CATEGORY_COLUMNS}"
    );
    let result = sqlx::query_as::<Sqlite, Category>(&query)
        .bind(title)
        .bind(description)
        .bind(slug)
        .bind(is_published)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
    tracing::info!(slug, is_published, "category created");
    Ok(result)
}

pub async fn set_category_published(
    pool: &SqlitePool,
    id: i64,
    is_published: bool,
) -> Result<(), RequestError> {
    let result = sqlx::query(r#"UPDATE categories SET is_published = $1 WHERE id = $2"#)
        .bind(is_published)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Category not found"));
    }
    Ok(())
}

pub async fn insert_location(
    pool: &SqlitePool,
    name: &str,
    is_published: bool,
) -> Result<Location, RequestError> {
    let query = format!(
        "INSERT INTO locations (name, is_published, created_at) VALUES ($1, $2, $3) RETURNING {LOCATION_COLUMNS}"
    );
    let result = sqlx::query_as::<Sqlite, Location>(&query)
        .bind(name)
        .bind(is_published)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
    tracing::info!(name, is_published, "location created");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::{
        create_post_in_db, get_post_by_id, list_posts_in_db, test_support::*, PostFilter,
    };
    use chrono::Duration;

    #[tokio::test]
    async fn unpublished_category_is_not_found_by_slug() {
        let pool = test_pool().await;
        let travel = category(&pool, "travel", true).await;
        category(&pool, "drafts", false).await;

        assert_eq!(
            get_published_category_by_slug(&pool, "travel")
                .await
                .unwrap()
                .map(|c| c.id),
            Some(travel.id)
        );
        assert!(get_published_category_by_slug(&pool, "drafts")
            .await
            .unwrap()
            .is_none());
        assert!(get_published_category_by_slug(&pool, "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unpublishing_a_category_hides_its_posts() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let travel = category(&pool, "travel", true).await;
        let mut data = post_data("trip", Utc::now() - Duration::hours(1));
        data.category_id = Some(travel.id);
        create_post_in_db(&pool, author.id, &data).await.unwrap();

        let before = list_posts_in_db(&pool, PostFilter::published(), None)
            .await
            .unwrap();
        assert_eq!(before.count, 1);

        set_category_published(&pool, travel.id, false).await.unwrap();
        let after = list_posts_in_db(&pool, PostFilter::published(), None)
            .await
            .unwrap();
        assert_eq!(after.count, 0);
    }

    #[tokio::test]
    async fn choices_exist_checks() {
        let pool = test_pool().await;
        let travel = category(&pool, "travel", true).await;
        let harbour = insert_location(&pool, "Harbour", false).await.unwrap();

        assert!(category_exists(&pool, travel.id).await.unwrap());
        assert!(!category_exists(&pool, travel.id + 100).await.unwrap());
        assert!(location_exists(&pool, harbour.id).await.unwrap());
        assert_eq!(list_categories_in_db(&pool).await.unwrap().len(), 1);
        assert_eq!(list_locations_in_db(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_location_keeps_the_post() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let harbour = insert_location(&pool, "Harbour", true).await.unwrap();
        let mut data = post_data("seaside", Utc::now());
        data.location_id = Some(harbour.id);
        let post = create_post_in_db(&pool, author.id, &data).await.unwrap();

        sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(harbour.id)
            .execute(&pool)
            .await
            .unwrap();

        let post = get_post_by_id(&pool, post.id).await.unwrap().unwrap();
        assert_eq!(post.location_id, None);
    }
}
