//! Command-line commands.
//!
//! The first argument selects a command by exact name. Without a match the
//! command catalogue is printed instead.

pub mod check;
pub mod server;

use std::fmt::Write as _;

use async_trait::async_trait;

use crate::bootstrap::Bootstrap;
use crate::error::Result;

pub use check::CheckCommand;
pub use server::ServerCommand;

#[async_trait]
pub trait Command: Send + Sync {
    /// Exact name matched against the first argument.
    fn name(&self) -> &str;

    /// One-line summary shown in the catalogue.
    fn description(&self) -> &str;

    async fn run(&self, bootstrap: &Bootstrap) -> Result<()>;
}

/// The catalogue printed when no command matches.
pub fn help(bootstrap: &Bootstrap) -> String {
    let mut out = String::from("Available commands:\n");
    for command in bootstrap.commands() {
        let _ = writeln!(out, "    {}\t{}", command.name(), command.description());
    }
    out
}
