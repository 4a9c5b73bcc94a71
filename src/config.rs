use anyhow::{anyhow, Context};
use sqlx::postgres::PgSslMode;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    // Database
    pub database_url: Option<String>,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_ssl_mode: PgSslMode,
    pub db_ssl_root_cert: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub run_migrations: bool,

    // HTTP
    pub cors_allow_origin: String,

    // Caller identity
    pub actor_header: String,
    pub default_actor: String,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,

            database_url: None,
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_user: "postgres".to_string(),
            db_password: String::new(),
            db_name: "postgres".to_string(),
            // Certificates are validated unless explicitly disabled
            db_ssl_mode: PgSslMode::VerifyFull,
            db_ssl_root_cert: None,
            db_max_connections: 10,
            db_acquire_timeout_secs: 30,
            run_migrations: true,

            cors_allow_origin: "*".to_string(),

            actor_header: "X-User-Id".to_string(),
            default_actor: "current_user".to_string(),

            log_format: LogFormat::Text,
        }
    }
}

fn parse<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {}: {}", name, e))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, starting from the
    /// defaults and overriding every variable that is set.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", &port)?;
        }

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(db_host) = lookup("DB_HOST") {
            config.db_host = db_host;
        }

        if let Some(db_port) = lookup("DB_PORT") {
            config.db_port = parse("DB_PORT", &db_port)?;
        }

        if let Some(db_user) = lookup("DB_USER") {
            config.db_user = db_user;
        }

        if let Some(db_password) = lookup("DB_PASS") {
            config.db_password = db_password;
        }

        if let Some(db_name) = lookup("DB_NAME") {
            config.db_name = db_name;
        }

        if let Some(ssl_mode) = lookup("DB_SSL_MODE") {
            config.db_ssl_mode = parse("DB_SSL_MODE", &ssl_mode)?;
        }

        config.db_ssl_root_cert = lookup("DB_SSL_ROOT_CERT").filter(|path| !path.trim().is_empty());

        if let Some(max) = lookup("DB_MAX_CONNECTIONS") {
            config.db_max_connections = parse("DB_MAX_CONNECTIONS", &max)?;
        }

        if let Some(timeout) = lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            config.db_acquire_timeout_secs = parse("DB_ACQUIRE_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(run) = lookup("RUN_MIGRATIONS") {
            config.run_migrations = parse("RUN_MIGRATIONS", &run)?;
        }

        if let Some(origin) = lookup("CORS_ALLOW_ORIGIN") {
            config.cors_allow_origin = origin;
        }

        if let Some(header) = lookup("ACTOR_HEADER") {
            config.actor_header = header;
        }

        if let Some(actor) = lookup("DEFAULT_ACTOR") {
            config.default_actor = actor;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(anyhow!("Invalid LOG_FORMAT: {}", format)),
            };
        }

        if config.db_max_connections == 0 {
            return Err(anyhow!("DB_MAX_CONNECTIONS must be at least 1"));
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip: std::net::IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid HOST: {}", self.host))?;
        Ok(std::net::SocketAddr::from((ip, self.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_port, 5432);
        assert!(matches!(config.db_ssl_mode, PgSslMode::VerifyFull));
        assert_eq!(config.default_actor, "current_user");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("DB_HOST", "db.internal"),
            ("DB_SSL_MODE", "disable"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("RUN_MIGRATIONS", "false"),
            ("LOG_FORMAT", "JSON"),
            ("DEFAULT_ACTOR", "system"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.db_host, "db.internal");
        assert!(matches!(config.db_ssl_mode, PgSslMode::Disable));
        assert_eq!(config.db_max_connections, 4);
        assert!(!config.run_migrations);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_actor, "system");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DB_SSL_MODE", "sometimes")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).is_err());
    }

    #[test]
    fn test_empty_database_url_is_ignored() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::from_lookup(lookup(&[("HOST", "127.0.0.1"), ("PORT", "9000")])).unwrap();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
    }
}
