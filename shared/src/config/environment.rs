//! Deployment environment and log output settings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where the server is running; picks defaults for CORS, logging and
/// HTTPS enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    /// Shared pre-release deployment, production-like but verbose
    Staging,
    Production,
}

impl Environment {
    const ALL: [Environment; 3] = [Self::Development, Self::Staging, Self::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }

    /// `ENVIRONMENT`, falling back to `APP_ENV`; unknown values mean development
    pub fn from_env() -> Self {
        ["ENVIRONMENT", "APP_ENV"]
            .iter()
            .find_map(|key| std::env::var(key).ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Optional TOML overlay read by `AppConfig::load`
    pub fn config_file(&self) -> String {
        format!("config/{}.toml", self.as_str())
    }

    /// Dotenv file read before the plain `.env`
    pub fn env_file(&self) -> String {
        format!(".env.{}", self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "dev" | "local" => "development",
            "stage" => "staging",
            "prod" => "production",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == alias)
            .ok_or_else(|| format!("unknown environment \"{}\"", s))
    }
}

/// Output shape of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, for log shippers
    Json,
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Attach file and line to each event
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    pub fn for_environment(env: Environment) -> Self {
        let (level, format) = match env {
            Environment::Development => ("debug,sqlx=warn,actix_server=info", LogFormat::Pretty),
            Environment::Staging => ("debug,sqlx=warn", LogFormat::Compact),
            Environment::Production => ("info,sqlx=warn", LogFormat::Json),
        };
        Self {
            level: level.to_string(),
            format,
            source_location: !env.is_production(),
        }
    }
}
