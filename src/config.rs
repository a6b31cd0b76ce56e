use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub setup_token_hours: i64,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters".to_string());
        }

        let host: IpAddr = env_or("USERFLOW_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid USERFLOW_HOST: {e}"))?;

        let port: u16 = env_or("USERFLOW_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid USERFLOW_PORT: {e}"))?;

        // Import uploads go through this limit, so it is larger than a typical JSON API.
        let max_body_size: usize = env_or("USERFLOW_MAX_BODY_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid USERFLOW_MAX_BODY_SIZE: {e}"))?;

        let access_token_minutes = env_positive("USERFLOW_ACCESS_TOKEN_MINUTES", "15")?;
        let refresh_token_days = env_positive("USERFLOW_REFRESH_TOKEN_DAYS", "7")?;
        let setup_token_hours = env_positive("USERFLOW_SETUP_TOKEN_HOURS", "72")?;

        let cors_origins: Vec<String> = env_or("USERFLOW_CORS_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let log_level = env_or("USERFLOW_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            max_body_size,
            access_token_minutes,
            refresh_token_days,
            setup_token_hours,
            cors_origins,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_positive(key: &str, default: &str) -> Result<i64, String> {
    let value: i64 = env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))?;
    if value <= 0 {
        return Err(format!("Invalid {key}: must be positive"));
    }
    Ok(value)
}
