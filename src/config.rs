//! Application configuration management.
//!
//! Configuration is loaded from environment variables, deserialized into a
//! type-safe struct by the `envy` crate.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `QR_TTL_MINUTES` (optional): how long an issued QR code stays
///   redeemable, defaults to 15
/// - `POINT_EXPIRY_MONTHS` (optional): calendar months before earned points
///   expire, defaults to 12
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_qr_ttl_minutes")]
    pub qr_ttl_minutes: i64,

    #[serde(default = "default_point_expiry_months")]
    pub point_expiry_months: u32,
}

fn default_port() -> u16 {
    3000
}

fn default_qr_ttl_minutes() -> i64 {
    15
}

fn default_point_expiry_months() -> u32 {
    12
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Attempts to load a `.env` file first (optional), then deserializes
    /// the environment into a Config struct. Field names map to upper-case
    /// variables: `database_url` -> `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or values cannot
    /// be parsed into the expected types.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }
}
