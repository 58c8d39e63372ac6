use std::borrow::Cow;

use axum::http::Uri;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::FormErrors;
use crate::models::{CommentListing, Post, User};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user with that email already exists.";
pub const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(validation_error("required", REQUIRED));
    }
    if username.chars().count() > 150 {
        return Err(validation_error(
            "max_length",
            "Ensure this value has at most 150 characters.",
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || "@.+-_".contains(c);
    if !username.chars().all(allowed) {
        return Err(validation_error(
            "invalid",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

fn validate_optional_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || validator::validate_email(email) {
        Ok(())
    } else {
        Err(validation_error("email", "Enter a valid email address."))
    }
}

fn validate_required_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(validation_error("required", REQUIRED));
    }
    validate_optional_email(email)
}

/// Accepts the `datetime-local` widget format as well as RFC 3339.
/// Values without an offset are taken as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_choice(raw: &str) -> Result<Option<i64>, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>().map(Some).map_err(|_| INVALID_CHOICE)
}

fn non_empty(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

// ----------------- Post Form -----------------
#[derive(Deserialize, Serialize, Debug, Default, Clone, Validate)]
#[serde(default)]
pub struct PostForm {
    #[validate(length(
        min = 1,
        max = 256,
        message = "Enter a title of 1 to 256 characters."
    ))]
    pub title: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
    pub pub_date: String,
    pub location: String,
    pub category: String,
    pub image: String,
    pub is_published: Option<bool>,
}

/// A post form that passed every check which does not need the database.
#[derive(Debug, Clone, PartialEq)]
pub struct PostData {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub is_published: bool,
}

impl PostForm {
    pub fn from_post(post: &Post) -> Self {
        PostForm {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format("%Y-%m-%dT%H:%M").to_string(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            image: post.image.clone().unwrap_or_default(),
            is_published: Some(post.is_published),
        }
    }

    /// `default_published` is used when the form leaves `is_published` out:
    /// true for new posts, the stored value when editing.
    pub fn clean(&self, default_published: bool) -> Result<PostData, FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => e.into(),
        };

        let pub_date = if self.pub_date.trim().is_empty() {
            errors.add("pub_date", REQUIRED);
            None
        } else {
            let parsed = parse_datetime(&self.pub_date);
            if parsed.is_none() {
                errors.add("pub_date", "Enter a valid date/time.");
            }
            parsed
        };
        let location_id = parse_choice(&self.location).unwrap_or_else(|message| {
            errors.add("location", message);
            None
        });
        let category_id = parse_choice(&self.category).unwrap_or_else(|message| {
            errors.add("category", message);
            None
        });

        match pub_date {
            Some(pub_date) if errors.is_empty() => Ok(PostData {
                title: self.title.trim().to_string(),
                text: self.text.clone(),
                pub_date,
                location_id,
                category_id,
                image: non_empty(&self.image),
                is_published: self.is_published.unwrap_or(default_published),
            }),
            _ => Err(errors),
        }
    }
}

// ----------------- Comment Form -----------------
#[derive(Deserialize, Serialize, Debug, Default, Clone, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    pub fn from_comment(comment: &CommentListing) -> Self {
        CommentForm {
            text: comment.text.clone(),
        }
    }

    pub fn clean(&self) -> Result<String, FormErrors> {
        if self.text.trim().is_empty() {
            let mut errors = FormErrors::new();
            errors.add("text", REQUIRED);
            return Err(errors);
        }
        self.validate()?;
        Ok(self.text.clone())
    }
}

// ----------------- User Forms -----------------
#[derive(Deserialize, Serialize, Debug, Default, Clone, Validate)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(custom = "validate_username")]
    pub username: String,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub first_name: String,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: String,
    #[validate(custom = "validate_optional_email")]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password1: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn clean(&self) -> Result<NewUser, FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => e.into(),
        };

        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", "The two password fields didn't match.");
            } else {
                for message in password_problems(&self.password2, &self.username) {
                    errors.add("password2", message);
                }
            }
        }

        errors.into_result()?;
        Ok(NewUser {
            username: self.username.clone(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password: self.password1.clone(),
        })
    }
}

fn password_problems(password: &str, username: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if password.chars().count() < 8 {
        problems.push("This password is too short. It must contain at least 8 characters.");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.");
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        problems.push("The password is too similar to the username.");
    }
    problems
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, Validate)]
#[serde(default)]
pub struct UserEditForm {
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub first_name: String,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: String,
    #[validate(custom = "validate_username")]
    pub username: String,
    #[validate(custom = "validate_required_email")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileData {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserEditForm {
    pub fn from_user(user: &User) -> Self {
        UserEditForm {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    pub fn clean(&self) -> Result<ProfileData, FormErrors> {
        self.validate()?;
        Ok(ProfileData {
            username: self.username.clone(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct LoginQueryParams {
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginQueryParams {
    /// Only local paths are followed after login. Anything that is not a
    /// plain absolute path on this site gives `/`.
    pub fn redirect_target(&self) -> &str {
        match self.next.as_deref() {
            Some(next) if is_local_path(next) => next,
            _ => "/",
        }
    }
}

fn is_local_path(next: &str) -> bool {
    if !next.starts_with('/') || next.starts_with("//") {
        return false;
    }
    // Browsers read `/\host` the way they read `//host`.
    if next.contains('\\') || next.chars().any(char::is_control) {
        return false;
    }
    match next.parse::<Uri>() {
        Ok(uri) => uri.scheme().is_none() && uri.authority().is_none(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn post_form() -> PostForm {
        PostForm {
            title: "A trip".to_string(),
            text: "It was long.".to_string(),
            pub_date: "2024-05-01T10:30".to_string(),
            ..Default::default()
        }
    }

    fn registration() -> RegistrationForm {
        RegistrationForm {
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            password1: "s3cret-pass".to_string(),
            password2: "s3cret-pass".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn datetime_local_input_is_parsed_as_utc() {
        let parsed = parse_datetime("2024-05-01T10:30").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 5, 1));
        assert_eq!((parsed.hour(), parsed.minute()), (10, 30));
        assert!(parse_datetime("2024-05-01T10:30:00+02:00").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn post_form_defaults_to_published() {
        let data = post_form().clean(true).unwrap();
        assert!(data.is_published);
        assert_eq!(data.category_id, None);
        assert_eq!(data.image, None);

        let mut draft = post_form();
        draft.is_published = Some(false);
        assert!(!draft.clean(true).unwrap().is_published);
    }

    #[test]
    fn post_form_reports_every_bad_field() {
        let form = PostForm {
            category: "travel".to_string(),
            ..Default::default()
        };
        let errors = form.clean(true).unwrap_err();
        assert!(errors.contains("title"));
        assert!(errors.contains("text"));
        assert_eq!(errors.get("pub_date"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.get("category"), Some(&[INVALID_CHOICE.to_string()][..]));
    }

    #[test]
    fn blank_comment_is_rejected() {
        let form = CommentForm {
            text: "   ".to_string(),
        };
        assert!(form.clean().unwrap_err().contains("text"));
    }

    #[test]
    fn registration_checks_passwords() {
        assert!(registration().clean().is_ok());

        let mut mismatch = registration();
        mismatch.password2 = "something-else".to_string();
        assert!(mismatch.clean().unwrap_err().contains("password2"));

        let mut numeric = registration();
        numeric.password1 = "1234".to_string();
        numeric.password2 = "1234".to_string();
        let errors = numeric.clean().unwrap_err();
        assert_eq!(errors.get("password2").map(<[String]>::len), Some(2));
    }

    #[test]
    fn registration_checks_username_and_email() {
        let mut form = registration();
        form.username = "not valid!".to_string();
        form.email = "nope".to_string();
        let errors = form.clean().unwrap_err();
        assert!(errors.contains("username"));
        assert!(errors.contains("email"));

        let mut no_email = registration();
        no_email.email = String::new();
        assert!(no_email.clean().is_ok());
    }

    #[test]
    fn profile_edit_requires_username_and_email() {
        let errors = UserEditForm::default().clean().unwrap_err();
        assert_eq!(errors.get("username"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.get("email"), Some(&[REQUIRED.to_string()][..]));
    }

    #[test]
    fn login_only_follows_local_paths() {
        let local = LoginQueryParams {
            next: Some("/posts/create".to_string()),
        };
        assert_eq!(local.redirect_target(), "/posts/create");
        let foreign = LoginQueryParams {
            next: Some("//evil.example".to_string()),
        };
        assert_eq!(foreign.redirect_target(), "/");
        assert_eq!(LoginQueryParams::default().redirect_target(), "/");
    }

    #[test]
    fn login_rejects_unsafe_next() {
        for next in [
            "/\\evil.example",
            "/a\nb",
            "/tab\there",
            "https://evil.example/",
            "posts/create",
            "/with space",
        ] {
            let params = LoginQueryParams {
                next: Some(next.to_string()),
            };
            assert_eq!(params.redirect_target(), "/", "next = {next:?}");
        }

        let with_query = LoginQueryParams {
            next: Some("/profile/reader?page=2".to_string()),
        };
        assert_eq!(with_query.redirect_target(), "/profile/reader?page=2");
    }
}
