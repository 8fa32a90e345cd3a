use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::server::db::sqlite::SqlDB;

pub struct AppState {
    pub db: SqlDB,
    pub config: Config,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: usize,
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    pub jwt_secret: String,
    pub jwt_expire_minutes: i64,
}

fn default_max_connections() -> u32 {
    5
}

/// Parse the config file into Config struct.
pub async fn parse_config(filepath: &str) -> Result<Config> {
    let content = fs::read_to_string(filepath).context("failed to read config file")?;
    let c: Config = toml::from_str(&content).context("failed to convert toml config data")?;

    validate(&c)?;
    Ok(c)
}

pub fn validate(c: &Config) -> Result<()> {
    if !hostname_validator::is_valid(&c.host) {
        return Err(anyhow::Error::msg(format!("host '{}' is invalid", c.host)));
    }

    if c.port > 65535 {
        return Err(anyhow::Error::msg(format!(
            "port '{}' is invalid, must be between [0, 65535]",
            c.port
        )));
    }

    if c.max_connections < 1 {
        return Err(anyhow::Error::msg(
            "max_connections must be at least 1".to_string(),
        ));
    }

    if c.jwt_secret.is_empty() {
        return Err(anyhow::Error::msg("jwt secret must not be empty".to_string()));
    }

    if c.jwt_expire_minutes < 1 || c.jwt_expire_minutes > 24 * 60 {
        return Err(anyhow::Error::msg(format!(
            "jwt expiry interval in minutes '{}' is invalid, must be between [1, 1440]",
            c.jwt_expire_minutes
        )));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn config() -> Config {
        Config {
            host: "localhost".into(),
            port: 3000,
            database_url: "sqlite::memory:".into(),
            max_connections: 5,
            jwt_secret: "secret".into(),
            jwt_expire_minutes: 30,
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate(&config()).is_ok());

        let c = Config {
            host: "not a host!".into(),
            ..config()
        };
        assert!(validate(&c).is_err());

        let c = Config {
            port: 70000,
            ..config()
        };
        assert!(validate(&c).is_err());

        let c = Config {
            jwt_secret: String::new(),
            ..config()
        };
        assert!(validate(&c).is_err());

        for minutes in [0, 1441] {
            let c = Config {
                jwt_expire_minutes: minutes,
                ..config()
            };
            assert!(validate(&c).is_err());
        }
    }

    #[tokio::test]
    async fn test_parse_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
host = "localhost"
port = 3000
database_url = "sqlite://todos.db"
jwt_secret = "secret"
jwt_expire_minutes = 30
"#
        )
        .unwrap();

        let c = parse_config(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(c.port, 3000);
        assert_eq!(c.database_url, "sqlite://todos.db");
        assert_eq!(c.max_connections, 5);

        assert!(parse_config("/nonexistent/config.toml").await.is_err());
    }
}
