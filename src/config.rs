use std::env;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub service_name: String,
    pub log_format: LogFormat,
    /// `(key, raw value)` pairs that failed to parse and fell back to their
    /// default. Read before tracing is up, so `main` logs them afterwards.
    pub invalid_values: Vec<(String, String)>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` uses the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut invalid_values = Vec::new();
        let database_max_connections =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5, &mut invalid_values);

        Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://grocery.db".to_string()),
            database_max_connections,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "grocery-list".to_string()),
            log_format: match lookup("LOG_FORMAT") {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            invalid_values,
        }
    }

    /// Settings for tests: a private in-memory store.
    pub fn in_memory() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            bind_addr: "127.0.0.1:0".to_string(),
            service_name: "grocery-list".to_string(),
            log_format: LogFormat::Pretty,
            invalid_values: Vec::new(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    invalid: &mut Vec<(String, String)>,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            invalid.push((key.to_string(), raw));
            default
        }),
        None => default,
    }
}
