//! CLI command implementations

pub mod blocks;
pub mod compile;
pub mod init;
pub mod validate;
pub mod watch;
