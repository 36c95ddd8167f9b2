//! Server configuration from environment variables.
//!
//! | Variable             | Default           |
//! |----------------------|-------------------|
//! | `SERVER_NAME`        | `custom-server`   |
//! | `SERVER_VERSION`     | `1.0.0`           |
//! | `MCP_TRANSPORT_MODE` | `stdio`           |
//! | `HOST`               | `0.0.0.0`         |
//! | `PORT`               | `3000`            |
//! | `WORKER_THREADS`     | CPUs, at most 16  |

use std::str::FromStr;

use crate::core::error::ConfigError;

pub const DEFAULT_SERVER_NAME: &str = "custom-server";
pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
const MAX_DEFAULT_WORKERS: usize = 16;

/// Which transports to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Line-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP
    Http,
    /// stdio in the background, HTTP in the foreground
    Both,
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            "both" => Ok(TransportMode::Both),
            other => Err(ConfigError::InvalidTransport(other.to_string())),
        }
    }
}

/// Advertised server identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            version: DEFAULT_SERVER_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: default_workers(),
        }
    }
}

/// Defaults to the CPU count, capped to avoid excessive context switching.
fn default_workers() -> usize {
    num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub info: ServerInfo,
    pub transport: TransportMode,
    pub http: HttpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            info: ServerInfo::default(),
            transport: TransportMode::Stdio,
            http: HttpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let info = ServerInfo {
            name: lookup("SERVER_NAME").unwrap_or(defaults.info.name),
            version: lookup("SERVER_VERSION").unwrap_or(defaults.info.version),
        };

        let transport = match lookup("MCP_TRANSPORT_MODE") {
            Some(mode) => mode.parse()?,
            None => defaults.transport,
        };

        let port = match lookup("PORT") {
            Some(port) => port.parse::<u16>().map_err(|_| ConfigError::InvalidPort(port))?,
            None => defaults.http.port,
        };

        let workers = match lookup("WORKER_THREADS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidWorkers(raw)),
            },
            None => defaults.http.workers,
        };

        Ok(Self {
            info,
            transport,
            http: HttpConfig {
                host: lookup("HOST").unwrap_or(defaults.http.host),
                port,
                workers,
            },
        })
    }
}
