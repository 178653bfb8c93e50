//! Process settings read from the environment (optionally seeded from `.env`).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    /// No URL means the in-memory store.
    pub database_url: Option<String>,
    pub db_schema: String,
    pub db_max_connections: u32,
    pub mount_unwired_routes: bool,
    pub catalog_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source; `PORT` is mandatory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port_raw = var("PORT").ok_or(SettingsError::Missing("PORT"))?;
        let port = port_raw.parse::<u16>().map_err(|_| SettingsError::Invalid {
            name: "PORT",
            value: port_raw.clone(),
        })?;

        let host = match var("HOST") {
            Some(h) => h.parse::<IpAddr>().map_err(|_| SettingsError::Invalid { name: "HOST", value: h })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(n) => n.parse::<u32>().ok().filter(|n| *n > 0).ok_or(SettingsError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                value: n,
            })?,
            None => 5,
        };

        let db_schema = var("DB_SCHEMA").unwrap_or_else(|| "public".into());
        if !db_schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SettingsError::Invalid {
                name: "DB_SCHEMA",
                value: db_schema,
            });
        }

        let mount_unwired_routes = match var("MOUNT_UNWIRED_ROUTES") {
            Some(v) => parse_flag(&v).ok_or(SettingsError::Invalid {
                name: "MOUNT_UNWIRED_ROUTES",
                value: v,
            })?,
            None => false,
        };

        let log_format = match var("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("text") | Some("pretty") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(SettingsError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Settings {
            host,
            port,
            database_url: var("DATABASE_URL"),
            db_schema,
            db_max_connections,
            mount_unwired_routes,
            catalog_path: var("CATALOG_PATH").map(PathBuf::from),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
