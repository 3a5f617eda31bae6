use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::connectors::MailboxQuery;

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for a tracker run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub mailbox: MailboxConfig,
    pub oracle: OracleConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let store = StoreConfig {
            path: PathBuf::from(
                env::var("TRACKER_STORE_PATH")
                    .unwrap_or_else(|_| "application_tracking.csv".to_string()),
            ),
            history_path: optional_var("TRACKER_HISTORY_PATH").map(PathBuf::from),
            metrics_path: optional_var("TRACKER_METRICS_PATH").map(PathBuf::from),
        };

        let window_days = parse_var("TRACKER_WINDOW_DAYS", 10u32)?;
        if window_days == 0 {
            return Err(ConfigError::Invalid {
                variable: "TRACKER_WINDOW_DAYS",
                reason: "must be at least 1",
            });
        }
        let subject_terms = env::var("TRACKER_SUBJECT_TERMS")
            .unwrap_or_else(|_| "application,status".to_string())
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect();

        let mailbox = MailboxConfig {
            client_secret_path: PathBuf::from(
                env::var("GMAIL_CLIENT_SECRET_PATH")
                    .unwrap_or_else(|_| "credentials.json".to_string()),
            ),
            token_cache_path: PathBuf::from(
                env::var("GMAIL_TOKEN_CACHE_PATH").unwrap_or_else(|_| "token.json".to_string()),
            ),
            user_id: env::var("GMAIL_USER_ID").unwrap_or_else(|_| "me".to_string()),
            window_days,
            subject_terms,
        };

        let max_tokens = parse_var("OPENAI_MAX_TOKENS", 150u32)?;
        if max_tokens == 0 {
            return Err(ConfigError::Invalid {
                variable: "OPENAI_MAX_TOKENS",
                reason: "must be at least 1",
            });
        }
        let temperature = parse_var("OPENAI_TEMPERATURE", 0.7f32)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                variable: "OPENAI_TEMPERATURE",
                reason: "must be between 0.0 and 2.0",
            });
        }

        let oracle = OracleConfig {
            api_key: optional_var("OPENAI_API_KEY"),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            max_tokens,
            temperature,
            timeout_secs: parse_var("OPENAI_TIMEOUT_SECS", 60u64)?,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            store,
            mailbox,
            oracle,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            variable: name,
            reason: "not a valid number",
        }),
        None => Ok(default),
    }
}

/// Locations of the tracking table and its companions.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub history_path: Option<PathBuf>,
    pub metrics_path: Option<PathBuf>,
}

/// Gmail access and candidate search settings.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub client_secret_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub user_id: String,
    pub window_days: u32,
    pub subject_terms: Vec<String>,
}

impl MailboxConfig {
    pub fn query(&self) -> MailboxQuery {
        MailboxQuery::new(self.window_days, self.subject_terms.clone())
    }
}

/// Chat-completions settings for the classification oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid {
        variable: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { variable, reason } => write!(f, "{variable} {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
