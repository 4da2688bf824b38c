//! CLI command implementations

pub mod add;
pub mod config;
pub mod diff;
pub mod get;
pub mod init;
pub mod log;
pub mod ls;
pub mod rm;
pub mod status;
pub mod tag;
pub mod tags;
pub mod verify;
