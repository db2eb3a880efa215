use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub jwt: JwtConfig,
}

/// Token signing settings shared by the login flow and the `AuthUser` extractor.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub reset_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10) as u32;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let jwt = JwtConfig::from_env()?;
        Ok(Self {
            port,
            database_url,
            max_connections,
            host,
            frontend_url,
            jwt,
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        Ok(Self {
            secret,
            access_ttl_minutes: env_or("JWT_ACCESS_TTL_MINUTES", 60),
            refresh_ttl_days: env_or("JWT_REFRESH_TTL_DAYS", 14),
            reset_ttl_minutes: env_or("RESET_TOKEN_TTL_MINUTES", 5),
        })
    }
}

fn env_or(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
