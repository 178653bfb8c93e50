//! Entity catalog: declarative types, the built-in catalog, validation, resolution, and process settings.

pub mod types;
pub mod loader;
pub mod validator;
pub mod resolved;
pub mod settings;

pub use types::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
pub use settings::{LogFormat, Settings, SettingsError};
