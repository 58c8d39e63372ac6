use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: i64,
}

fn default_bind_address() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_token_expiry_days() -> i64 {
    90
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().context("DATABASE_URL and JWT_SECRET must be set")
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid BIND_ADDRESS {}", self.bind_address))
    }

    pub fn token_expiry(&self) -> time::Duration {
        time::Duration::days(self.token_expiry_days)
    }
}
