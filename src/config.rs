use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Application-level constants
pub const APP_NAME: &str = "Carebook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_STORE_HOST: &str = "localhost";
const DEFAULT_STORE_PORT: u16 = 27017;
const DEFAULT_DATABASE: &str = "healthcare-app";
const DEFAULT_ENVIRONMENT: &str = "staging";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "carebook_lib=info,carebook=info,tower_http=info"
}

/// Get the default data directory for the SQLite file.
/// Falls back to `./data` when the platform has no data dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("carebook"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Store location and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    /// Full URI override. Only honored when no credentials are set.
    pub uri: Option<String>,
    pub data_dir: PathBuf,
}

impl StoreConfig {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Connection URI for the configured store.
    ///
    /// Credentials take precedence over the `MONGODB_URI` override; the
    /// password is percent-encoded and authenticated against `admin`.
    pub fn connection_uri(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => format!(
                "mongodb://{user}:{}@{}:{}/{}?authSource=admin",
                percent_encode(password),
                self.host,
                self.port,
                self.database
            ),
            _ => self.uri.clone().unwrap_or_else(|| {
                format!("mongodb://{}:{}/{}", self.host, self.port, self.database)
            }),
        }
    }

    /// Connection URI with the password masked, safe for logs.
    pub fn redacted_uri(&self) -> String {
        match &self.password {
            Some(password) if self.has_credentials() => self
                .connection_uri()
                .replace(&percent_encode(password), "****"),
            _ => self.connection_uri(),
        }
    }

    /// Path of the SQLite file backing the store: `<data_dir>/<database>.db`.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.database))
    }
}

/// Runtime configuration, read from the environment only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub store: StoreConfig,
    /// `NODE_ENV`; reported in startup logs.
    pub environment: String,
    /// `DD_TRACE_ENABLED=true` turns on per-request tracing spans.
    pub trace_requests: bool,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Ok(Self {
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            store: StoreConfig {
                host: var("MONGODB_HOST").unwrap_or_else(|| DEFAULT_STORE_HOST.to_string()),
                port: parse_or("MONGODB_PORT", var("MONGODB_PORT"), DEFAULT_STORE_PORT)?,
                username: var("MONGODB_USERNAME"),
                password: var("MONGODB_PASSWORD"),
                database: var("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                uri: var("MONGODB_URI"),
                data_dir: var("CAREBOOK_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_data_dir),
            },
            environment: var("NODE_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            trace_requests: var("DD_TRACE_ENABLED").as_deref() == Some("true"),
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => {
            tracing::debug!("{key} not set, using default");
            Ok(default)
        }
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}

/// Percent-encode everything outside the URI unreserved set.
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
