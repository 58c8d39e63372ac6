use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;

use crate::JsonResponse;

pub const NON_FIELD_ERRORS: &str = "__all__";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("login required to access {0}")]
    LoginRequired(String),
    #[error("invalid form: {errors:?}")]
    InvalidForm {
        form: serde_json::Value,
        errors: FormErrors,
    },
    #[error("internal server error")]
    ServerError,
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(serde::Serialize)]
pub struct RequestErrorJsonWrapper {
    errors: RequestErrorJson,
}

#[derive(serde::Serialize)]
pub struct RequestErrorJson {
    body: Vec<String>,
}

impl RequestErrorJsonWrapper {
    pub fn new(error: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            errors: RequestErrorJson {
                body: vec![error.to_string()],
            },
        }
    }
}

/// Field name to messages, the way a form re-renders its errors.
#[derive(Debug, Default, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for FormErrors {
    fn from(value: validator::ValidationErrors) -> Self {
        let mut errors = FormErrors::new();
        for (field, field_errors) in value.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                errors.add(field, message);
            }
        }
        errors
    }
}

#[derive(Serialize)]
struct InvalidFormJson<'a> {
    form: &'a serde_json::Value,
    errors: &'a FormErrors,
}

impl RequestError {
    /// Keeps the submitted values so the caller can show them next to the errors.
    pub fn invalid_form<T: Serialize>(form: &T, errors: FormErrors) -> Self {
        let form = serde_json::to_value(form).unwrap_or(serde_json::Value::Null);
        RequestError::InvalidForm { form, errors }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJsonWrapper> {
        let (status_code, json) = match self {
            RequestError::NotFound(message) => {
                (StatusCode::NOT_FOUND, RequestErrorJsonWrapper::new(message))
            }
            RequestError::NotAuthorized(message) => (
                StatusCode::UNAUTHORIZED,
                RequestErrorJsonWrapper::new(message),
            ),
            RequestError::LoginRequired(_) => (
                StatusCode::UNAUTHORIZED,
                RequestErrorJsonWrapper::new("Login required"),
            ),
            RequestError::InvalidForm { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                RequestErrorJsonWrapper::new("Invalid form"),
            ),
            RequestError::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RequestErrorJsonWrapper::new("Internal Server Error"),
            ),
            RequestError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestErrorJsonWrapper::new("Internal Server Error"),
                )
            }
        };
        (status_code, Json(json))
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        match &self {
            RequestError::LoginRequired(next) => {
                Redirect::to(&format!("/auth/login?next={next}")).into_response()
            }
            RequestError::InvalidForm { form, errors } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(InvalidFormJson { form, errors }),
            )
                .into_response(),
            _ => self.to_json_response().into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "This field is required."))]
        title: String,
    }

    #[test]
    fn validation_errors_become_field_messages() {
        let errors: FormErrors = Sample {
            title: String::new(),
        }
        .validate()
        .unwrap_err()
        .into();
        assert_eq!(
            errors.get("title"),
            Some(&["This field is required.".to_string()][..])
        );
    }

    #[test]
    fn merge_keeps_messages_from_both_sides() {
        let mut left = FormErrors::new();
        left.add("username", "taken");
        let mut right = FormErrors::new();
        right.add("username", "too long");
        right.add("email", "taken");
        left.merge(right);
        assert_eq!(left.get("username").map(<[String]>::len), Some(2));
        assert!(left.contains("email"));
        assert!(left.into_result().is_err());
    }

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(
            RequestError::NotFound("Post not found").to_json_response().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::ServerError.to_json_response().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let response = RequestError::LoginRequired("/posts/create".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/auth/login?next=/posts/create"
        );
    }
}
