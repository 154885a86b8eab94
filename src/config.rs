use std::env;

use chrono::Duration;

use crate::auth::token::AuthSettings;
use crate::error::AppError;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub static_dir: String,
    pub fees: FeeSchedule,
    pub auth: AuthSettings,
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub base_fee: f64,
    pub per_kg_fee: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: 30.0,
            per_kg_fee: 15.0,
        }
    }
}

impl FeeSchedule {
    pub fn fee_for(&self, weight_kg: f64) -> f64 {
        self.base_fee + weight_kg.max(0.0) * self.per_kg_fee
    }
}

/// Admin account created at startup, since registration only hands out
/// sender, receiver and agent roles.
#[derive(Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let defaults = FeeSchedule::default();
        let seed_admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(SeedAdmin {
                email,
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
                password,
            }),
            _ => None,
        };

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| AppError::Internal("JWT_SECRET must be set".to_string()))?;
        let auth = AuthSettings {
            jwt_secret,
            token_ttl: Duration::hours(parse_or_default(
                "JWT_TTL_HOURS",
                DEFAULT_TOKEN_TTL_HOURS,
            )?),
            bcrypt_cost: parse_or_default("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
            fees: FeeSchedule {
                base_fee: parse_or_default("BASE_FEE", defaults.base_fee)?,
                per_kg_fee: parse_or_default("PER_KG_FEE", defaults.per_kg_fee)?,
            },
            auth,
            seed_admin,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
