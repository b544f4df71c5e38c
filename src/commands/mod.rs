//! Command implementations for the uyuniadm CLI

pub mod install;
pub mod migrate;
pub mod uninstall;
