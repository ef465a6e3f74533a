use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_NOTIFY_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// In-memory stores are used when unset
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub cors_allowed_origins: Vec<String>,
    /// Notifications are only logged when unset
    pub notify_webhook_url: Option<String>,
    pub notify_timeout: Duration,
    pub file_base_url: String,
    pub strict_transitions: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            ),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            notify_webhook_url: non_empty("NOTIFY_WEBHOOK_URL"),
            notify_timeout: Duration::from_secs(parse_or(
                &lookup,
                "NOTIFY_TIMEOUT_SECONDS",
                DEFAULT_NOTIFY_TIMEOUT_SECONDS,
            )),
            file_base_url: non_empty("FILE_BASE_URL").unwrap_or_else(|| "/uploads".to_string()),
            strict_transitions: parse_or(&lookup, "LISTING_STRICT_TRANSITIONS", false),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, ?default, "invalid config value, using default");
            default
        }),
        None => default,
    }
}
