//! Runtime configuration read from the environment (and a `.env` file).

use std::net::SocketAddr;
use std::path::PathBuf;

pub const LOCAL_BACKEND_URL: &str = "http://localhost:42614";
pub const REMOTE_BACKEND_URL: &str = "https://aspenlog.cc:42613";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_CREDENTIALS: &str = "database/credentials.json";
const DEFAULT_STATIC_DIR: &str = "static";

/// Where the token and connection address are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialBackend {
    #[default]
    Keyring,
    /// JSON file at [`Config::credentials_path`].
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the shell stores as the connection address at startup.
    pub backend_url: String,
    pub disable_http_cache: bool,
    pub bind: SocketAddr,
    pub credential_backend: CredentialBackend,
    pub credentials_path: PathBuf,
    pub static_dir: PathBuf,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so callers and tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).as_deref() == Some("true");

        let backend_url = if flag("BACKEND_LOCAL") {
            LOCAL_BACKEND_URL
        } else {
            REMOTE_BACKEND_URL
        };

        let bind = lookup("ASPENLOG_BIND")
            .and_then(|b| b.parse().ok())
            .unwrap_or_else(default_bind);

        let credential_backend = match lookup("ASPENLOG_CREDENTIAL_STORE").as_deref() {
            Some("file") => CredentialBackend::File,
            _ => CredentialBackend::Keyring,
        };

        Config {
            backend_url: backend_url.to_string(),
            disable_http_cache: flag("DISABLE_HTTP_CACHE"),
            bind,
            credential_backend,
            credentials_path: lookup("ASPENLOG_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS)),
            static_dir: lookup("ASPENLOG_STATIC")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        }
    }
}

fn default_bind() -> SocketAddr {
    DEFAULT_BIND
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000)))
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
