use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 parameters. `cost` is the iteration count.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub cost: u32,
    pub memory_kib: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    pub max_attempts: i32,
    pub lockout_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub lockout: LockoutConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "ibdpal".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "ibdpal-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24 * 7),
        };
        let password = PasswordConfig {
            cost: env_or("PASSWORD_HASH_COST", 12),
            memory_kib: env_or("PASSWORD_HASH_MEMORY_KIB", 19 * 1024),
        };
        let lockout = LockoutConfig {
            max_attempts: env_or("LOCKOUT_MAX_ATTEMPTS", 5),
            lockout_minutes: env_or("LOCKOUT_MINUTES", 15),
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            jwt,
            password,
            lockout,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
