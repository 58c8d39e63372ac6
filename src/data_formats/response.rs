use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, CommentListing, Location, PostListing, User};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AuthorResponse {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProfileResponse {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CategoryResponse {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LocationResponse {
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_published: bool,
    pub image: Option<String>,
    pub author: AuthorResponse,
    pub category: Option<CategoryResponse>,
    pub location: Option<LocationResponse>,
    pub comment_count: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorResponse,
}

/// One entry of a select widget.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChoiceResponse {
    pub id: i64,
    pub label: String,
}

impl ProfileResponse {
    pub fn new(
        User {
            username,
            first_name,
            last_name,
            date_joined,
            ..
        }: User,
    ) -> Self {
        ProfileResponse {
            username,
            first_name,
            last_name,
            date_joined,
        }
    }
}

impl CategoryResponse {
    pub fn new(
        Category {
            title,
            slug,
            description,
            ..
        }: Category,
    ) -> Self {
        CategoryResponse {
            title,
            slug,
            description,
        }
    }
}

impl PostResponse {
    pub fn new(
        PostListing {
            id,
            title,
            text,
            pub_date,
            image,
            is_published,
            created_at,
            author_username,
            author_first_name,
            author_last_name,
            category_title,
            category_slug,
            category_description,
            location_name,
            location_is_published,
            comment_count,
            ..
        }: PostListing,
    ) -> Self {
        let category = match (category_title, category_slug) {
            (Some(title), Some(slug)) => Some(CategoryResponse {
                title,
                slug,
                description: category_description.unwrap_or_default(),
            }),
            _ => None,
        };
        // Unpublished locations are left off the post, the post itself stays.
        let location = match (location_name, location_is_published) {
            (Some(name), Some(true)) => Some(LocationResponse { name }),
            _ => None,
        };
        PostResponse {
            id,
            title,
            text,
            pub_date,
            created_at,
            is_published,
            image,
            author: AuthorResponse {
                username: author_username,
                first_name: author_first_name,
                last_name: author_last_name,
            },
            category,
            location,
            comment_count,
        }
    }
}

impl CommentResponse {
    pub fn new(
        CommentListing {
            id,
            text,
            post_id,
            created_at,
            author_username,
            author_first_name,
            author_last_name,
            ..
        }: CommentListing,
    ) -> Self {
        CommentResponse {
            id,
            post_id,
            text,
            created_at,
            author: AuthorResponse {
                username: author_username,
                first_name: author_first_name,
                last_name: author_last_name,
            },
        }
    }
}

impl From<Category> for ChoiceResponse {
    fn from(category: Category) -> Self {
        ChoiceResponse {
            id: category.id,
            label: category.title,
        }
    }
}

impl From<Location> for ChoiceResponse {
    fn from(location: Location) -> Self {
        ChoiceResponse {
            id: location.id,
            label: location.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> PostListing {
        let now = Utc::now();
        PostListing {
            id: 3,
            title: "Title".to_string(),
            text: "Body".to_string(),
            pub_date: now,
            author_id: 1,
            image: None,
            is_published: true,
            created_at: now,
            author_username: "writer".to_string(),
            author_first_name: "Ann".to_string(),
            author_last_name: "Lee".to_string(),
            category_title: None,
            category_slug: None,
            category_description: None,
            category_is_published: None,
            location_name: Some("Harbour".to_string()),
            location_is_published: Some(false),
            comment_count: 4,
        }
    }

    #[test]
    fn unpublished_location_is_hidden() {
        let response = PostResponse::new(listing());
        assert!(response.location.is_none());
        assert!(response.category.is_none());
        assert_eq!(response.comment_count, 4);
        assert_eq!(response.author.username, "writer");
    }

    #[test]
    fn published_location_is_shown() {
        let mut post = listing();
        post.location_is_published = Some(true);
        let response = PostResponse::new(post);
        assert_eq!(response.location.map(|l| l.name).as_deref(), Some("Harbour"));
    }
}
