use serde::{Deserialize, Serialize};

use super::response::{
    CategoryResponse, ChoiceResponse, CommentResponse, PostResponse, ProfileResponse,
};
use crate::errors::FormErrors;
use crate::pagination::Page;

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexWrapper {
    pub page_obj: Page<PostResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryPostsWrapper {
    pub category: CategoryResponse,
    pub page_obj: Page<PostResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProfileWrapper {
    pub profile: ProfileResponse,
    pub page_obj: Page<PostResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostDetailWrapper<F> {
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
    pub form: F,
}

/// A form as it is shown before submission, or after a failed one.
#[derive(Debug, Deserialize, Serialize)]
pub struct FormWrapper<F> {
    pub form: F,
    pub errors: FormErrors,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostFormWrapper<F> {
    pub form: F,
    pub errors: FormErrors,
    pub categories: Vec<ChoiceResponse>,
    pub locations: Vec<ChoiceResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentWrapper<F> {
    pub comment: CommentResponse,
    pub form: F,
}

impl<F> FormWrapper<F> {
    pub fn wrap_with_form_data(form: F) -> FormWrapper<F> {
        FormWrapper {
            form,
            errors: FormErrors::new(),
        }
    }
}
