//! Stockroom: inventory and retail-management REST backend driven by a declarative entity catalog.

pub mod case;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::{builtin_catalog, resolve, FullConfig, ResolvedEntity, ResolvedModel, Settings};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::{app, common_routes_with_ready, entity_routes};
pub use service::CrudService;
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store, StoreError};
