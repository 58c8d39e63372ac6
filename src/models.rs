use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A post joined with its author, category, location and comment count, as
/// shown in listings and on the detail page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostListing {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub image: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_description: Option<String>,
    pub category_is_published: Option<bool>,
    pub location_name: Option<String>,
    pub location_is_published: Option<bool>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentListing {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
}

/// Entities that belong to the user who created them. Only the author may
/// edit or delete them.
pub trait Authored {
    fn author_id(&self) -> i64;

    fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id() == user_id
    }
}

impl Authored for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for CommentListing {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for PostListing {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl PostListing {
    /// Published, due and not filed under an unpublished category.
    pub fn is_publicly_visible(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.pub_date <= now && self.category_is_published.unwrap_or(true)
    }

    pub fn is_visible_to(&self, viewer: Option<i64>, now: DateTime<Utc>) -> bool {
        match viewer {
            Some(id) if self.is_authored_by(id) => true,
            _ => self.is_publicly_visible(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn listing(now: DateTime<Utc>) -> PostListing {
        PostListing {
            id: 1,
            title: "Title".to_string(),
            text: "Text".to_string(),
            pub_date: now - Duration::hours(1),
            author_id: 7,
            image: None,
            is_published: true,
            created_at: now - Duration::days(1),
            author_username: "author".to_string(),
            author_first_name: String::new(),
            author_last_name: String::new(),
            category_title: Some("Travel".to_string()),
            category_slug: Some("travel".to_string()),
            category_description: Some(String::new()),
            category_is_published: Some(true),
            location_name: None,
            location_is_published: None,
            comment_count: 0,
        }
    }

    #[test]
    fn published_post_is_public() {
        let now = Utc::now();
        assert!(listing(now).is_publicly_visible(now));
    }

    #[test]
    fn post_without_category_is_public() {
        let now = Utc::now();
        let mut post = listing(now);
        post.category_title = None;
        post.category_slug = None;
        post.category_description = None;
        post.category_is_published = None;
        assert!(post.is_publicly_visible(now));
    }

    #[test]
    fn hidden_posts_are_only_visible_to_their_author() {
        let now = Utc::now();

        let mut unpublished = listing(now);
        unpublished.is_published = false;

        let mut scheduled = listing(now);
        scheduled.pub_date = now + Duration::days(3);

        let mut hidden_category = listing(now);
        hidden_category.category_is_published = Some(false);

        for post in [unpublished, scheduled, hidden_category] {
            assert!(!post.is_publicly_visible(now));
            assert!(!post.is_visible_to(None, now));
            assert!(!post.is_visible_to(Some(8), now));
            assert!(post.is_visible_to(Some(7), now));
        }
    }

    #[test]
    fn only_the_author_owns_a_comment() {
        let comment = Comment {
            id: 1,
            text: "hi".to_string(),
            post_id: 2,
            author_id: 3,
            created_at: Utc::now(),
        };
        assert!(comment.is_authored_by(3));
        assert!(!comment.is_authored_by(4));
    }
}
