//! Subcommand implementations.

pub mod list;
pub mod logout;
pub mod show;
