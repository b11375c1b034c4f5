//! Server configuration from flags and environment

use chrono::Duration;
use clap::Parser;

use crate::auth::AuthSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "backstage")]
#[command(about = "Backstage server - artist team management with role-context authorization")]
#[command(version)]
pub struct Config {
    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:backstage.db?mode=rwc")]
    pub database_url: String,

    /// Address to listen on
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Lifetime of issued bearer tokens
    #[arg(long, env = "ACCESS_TOKEN_TTL_HOURS", default_value_t = 720)]
    pub token_ttl_hours: i64,

    /// Secret prepended to passwords before hashing
    #[arg(long, env = "PASSWORD_PEPPER", hide_env_values = true)]
    pub password_pepper: Option<String>,
}

impl Config {
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            token_ttl: Duration::hours(self.token_ttl_hours),
            pepper: self.password_pepper.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["backstage"]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.auth_settings().token_ttl, Duration::hours(720));
    }

    #[test]
    fn test_flags_override() {
        let config = Config::try_parse_from([
            "backstage",
            "--database-url",
            "sqlite::memory:",
            "--bind",
            "127.0.0.1:8080",
            "--token-ttl-hours",
            "1",
            "--password-pepper",
            "spice",
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.auth_settings().token_ttl, Duration::hours(1));
        assert_eq!(config.auth_settings().pepper.as_deref(), Some("spice"));
    }
}
