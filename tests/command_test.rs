//! Command dispatch through `gantry::run`.

mod common;

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::EmptyApp;
use gantry::command::help;
use gantry::{Application, Bootstrap, BoxError, Command, Configuration, Environment, Error};

struct Counting(Arc<AtomicUsize>);

#[async_trait]
impl Command for Counting {
    fn name(&self) -> &str {
        "count"
    }

    fn description(&self) -> &str {
        "Counts invocations"
    }

    async fn run(&self, bootstrap: &Bootstrap) -> gantry::Result<()> {
        assert_eq!(bootstrap.arguments()[0], "count");
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct WithCommand(Arc<AtomicUsize>);

#[async_trait]
impl Application for WithCommand {
    fn name(&self) -> &str {
        "with-command"
    }

    fn initialize(&self, bootstrap: &mut Bootstrap) {
        bootstrap.add_command(Counting(self.0.clone()));
    }

    async fn run(&self, _configuration: &Configuration, _environment: &mut Environment) -> Result<(), BoxError> {
        Ok(())
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_exact_name_selects_command() {
    let calls = Arc::new(AtomicUsize::new(0));
    gantry::run(WithCommand(calls.clone()), args(&["count"])).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    gantry::run(WithCommand(calls.clone()), args(&["Count"])).await.unwrap();
    gantry::run(WithCommand(calls.clone()), args(&["cou"])).await.unwrap();
    gantry::run(WithCommand(calls.clone()), args(&[])).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_help_lists_commands_in_order() {
    let mut bootstrap = Bootstrap::new(Arc::new(EmptyApp), vec![]);
    bootstrap.add_command(gantry::ServerCommand);
    bootstrap.add_command(gantry::CheckCommand);
    assert_eq!(
        help(&bootstrap),
        "Available commands:\n    server\tRuns the application as an HTTP server\n    check\tParses and validates the configuration file\n"
    );
}

#[tokio::test]
async fn test_check_command() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();
    let path = file.path().to_string_lossy().to_string();
    gantry::run(EmptyApp, vec!["check".into(), path]).await.unwrap();

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    writeln!(bad, "[logging]\nlevel = \"loud\"").unwrap();
    let path = bad.path().to_string_lossy().to_string();
    let err = gantry::run(EmptyApp, vec!["check".into(), path]).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn test_bad_arguments_are_reported() {
    let err = gantry::run(EmptyApp, args(&["check", "a.toml", "b.toml"])).await.unwrap_err();
    assert!(matches!(err, Error::Arguments(_)));
}
