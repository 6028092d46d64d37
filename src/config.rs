use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    Outbox,
    Webhook,
}

/// JWT signing parameters
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_hours: i64,
    pub refresh_ttl_days: i64,
    pub verification_ttl_hours: i64,
    pub invite_ttl_days: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub tenant: String,
    pub public_url: String,
    pub mail_backend: MailBackend,
    pub mail_webhook_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub idempotency_ttl: Duration,
    pub recipe_tags: Vec<String>,
    pub auth: AuthConfig,
}

const DEFAULT_RECIPE_TAGS: &str =
    "breakfast,lunch,dinner,dessert,snack,vegan,vegetarian,gluten-free,quick,baking";

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("⚠️  Invalid {} value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let store_backend = match var_or("STORE_BACKEND", "mongo").as_str() {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Mongo,
        };

        let mail_backend = match var_or("MAIL_BACKEND", "outbox").as_str() {
            "webhook" => MailBackend::Webhook,
            _ => MailBackend::Outbox,
        };

        AppConfig {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_or("PORT", 3002),
            store_backend,
            database_url: var_or("DATABASE_URL", "mongodb://localhost:27017/recipes"),
            tenant: var_or("TENANT_ID", "default"),
            public_url: var_or("PUBLIC_URL", "http://localhost:3000"),
            mail_backend,
            mail_webhook_url: env::var("MAIL_WEBHOOK_URL").ok(),
            allowed_origins: split_list(&var_or(
                "ALLOWED_ORIGINS",
                "http://localhost:3000,http://127.0.0.1:3000,http://localhost:5173",
            )),
            idempotency_ttl: Duration::from_secs(parse_or("IDEMPOTENCY_TTL_SECS", 600)),
            recipe_tags: split_list(&var_or("RECIPE_TAGS", DEFAULT_RECIPE_TAGS)),
            auth: AuthConfig {
                jwt_secret: var_or("JWT_SECRET", "default-secret-change-me"),
                jwt_issuer: var_or("JWT_ISSUER", "recipe-service"),
                jwt_audience: var_or("JWT_AUDIENCE", "recipe-api"),
                token_ttl_hours: parse_or("JWT_TTL_HOURS", 24),
                refresh_ttl_days: parse_or("REFRESH_TTL_DAYS", 30),
                verification_ttl_hours: parse_or("VERIFICATION_TTL_HOURS", 48),
                invite_ttl_days: parse_or("INVITE_TTL_DAYS", 14),
                bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            },
        }
    }

    /// In-memory configuration for tests and local runs
    pub fn for_tests() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            store_backend: StoreBackend::Memory,
            database_url: String::new(),
            tenant: "test".to_string(),
            public_url: "http://localhost:3000".to_string(),
            mail_backend: MailBackend::Outbox,
            mail_webhook_url: None,
            allowed_origins: vec![],
            idempotency_ttl: Duration::from_secs(600),
            recipe_tags: split_list(DEFAULT_RECIPE_TAGS),
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                jwt_issuer: "recipe-service".to_string(),
                jwt_audience: "recipe-api".to_string(),
                token_ttl_hours: 1,
                refresh_ttl_days: 1,
                verification_ttl_hours: 1,
                invite_ttl_days: 1,
                bcrypt_cost: 4,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_skips_empty() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_default_tags_are_unique() {
        let tags = AppConfig::for_tests().recipe_tags;
        let mut dedup = tags.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(tags.len(), dedup.len());
    }
}
