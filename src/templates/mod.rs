//! Rendered manifests and scripts with typed parameter contracts

pub mod issuer;
pub mod migrate;

pub use issuer::IssuerData;
pub use migrate::MigrateScriptData;
