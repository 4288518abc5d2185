use recommender_ml::DEFAULT_MODEL_PATH;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("PORT={raw}")))?,
            None => 8000,
        };

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        if host.trim().is_empty() {
            return Err(ConfigError::InvalidValue("HOST".to_string()));
        }

        let model_path = lookup("MODEL_PATH")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());

        Ok(Config {
            host,
            port,
            model_path: PathBuf::from(model_path),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for: {0}")]
    InvalidValue(String),
}
