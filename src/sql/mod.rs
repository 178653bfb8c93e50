//! Parameterized statements for catalog entities. Table and column names come from the resolved
//! model; every value travels as a bind parameter.

mod builder;
pub mod params;

pub use builder::*;
pub use params::PgBindValue;
