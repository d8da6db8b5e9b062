//! `check [config.toml]`: load and validate the configuration, then exit.

use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;

use crate::bootstrap::Bootstrap;
use crate::command::Command;
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "check", about = "Parses and validates the configuration file")]
struct CheckArgs {
    /// Configuration file (TOML)
    config: Option<PathBuf>,
}

pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    fn name(&self) -> &str {
        "check"
    }

    fn description(&self) -> &str {
        "Parses and validates the configuration file"
    }

    async fn run(&self, bootstrap: &Bootstrap) -> Result<()> {
        let args = CheckArgs::try_parse_from(bootstrap.arguments())?;
        bootstrap.configuration_factory().build(args.config.as_deref())?;
        println!("Configuration is OK");
        Ok(())
    }
}
