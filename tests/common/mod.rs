#![allow(dead_code)]

use std::net::TcpListener;

use blogicum::{db_helpers, init_db, make_router, models::User, run_app, Config};
use chrono::{Duration, Utc};
use reqwest::{header, redirect::Policy, Response, StatusCode};
use sqlx::{Sqlite, SqlitePool};

pub const PASSWORD: &str = "pass-w0rd-long";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub pool: SqlitePool,
}

pub async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "integration-secret".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        token_expiry_days: 1,
    };
    let pool = init_db(&config.database_url)
        .await
        .expect("Failed to create in-memory database");
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind a free port");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(run_app(make_router(), listener, pool.clone(), config));

    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();
    TestApp {
        address,
        client,
        pool,
    }
}

pub fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days))
        .format("%Y-%m-%dT%H:%M")
        .to_string()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    pub async fn post_form(
        &self,
        path: &str,
        cookie: Option<&str>,
        form: &[(&str, String)],
    ) -> Response {
        let mut request = self.client.post(self.url(path)).form(form);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    pub async fn get_json(&self, path: &str, cookie: Option<&str>) -> serde_json::Value {
        let response = self.get(path, cookie).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.json().await.unwrap()
    }

    pub async fn register(&self, username: &str, email: &str) -> Response {
        self.post_form(
            "/auth/registration",
            None,
            &[
                ("username", username.to_string()),
                ("email", email.to_string()),
                ("password1", PASSWORD.to_string()),
                ("password2", PASSWORD.to_string()),
            ],
        )
        .await
    }

    /// Registers `username` and returns a `Cookie` header value for it.
    pub async fn sign_up(&self, username: &str) -> String {
        let response = self
            .register(username, &format!("{username}@example.com"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        self.log_in(username).await
    }

    /// Logs in an existing user and returns a `Cookie` header value.
    pub async fn log_in(&self, username: &str) -> String {
        let response = self
            .post_form(
                "/auth/login",
                None,
                &[
                    ("username", username.to_string()),
                    ("password", PASSWORD.to_string()),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn user(&self, username: &str) -> User {
        db_helpers::get_user_by_username(&self.pool, username)
            .await
            .unwrap()
            .unwrap()
    }

    /// Creates a post through the form and returns its id.
    pub async fn create_post(&self, cookie: &str, extra: &[(&str, String)]) -> i64 {
        let mut form = vec![
            ("title", "A post".to_string()),
            ("text", "Some text".to_string()),
            ("pub_date", in_days(-1)),
        ];
        for (key, value) in extra {
            form.retain(|(existing, _)| existing != key);
            form.push((*key, value.clone()));
        }
        let response = self.post_form("/posts/create", Some(cookie), &form).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        sqlx::query_scalar::<Sqlite, i64>("SELECT MAX(id) FROM posts")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn comment_count(&self, post_id: i64) -> i64 {
        sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
