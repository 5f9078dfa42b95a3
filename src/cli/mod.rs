//! CLI command implementations

pub mod award;
pub mod init;
pub mod show;
pub mod tables;
