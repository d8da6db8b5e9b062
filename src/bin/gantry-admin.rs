use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gantry-admin")]
#[command(about = "Operator CLI for the gantry admin surface", long_about = None)]
struct Cli {
    /// Admin base URL, including the admin context path
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the admin surface answers
    Ping,
    /// Run every health check
    Healthcheck,
    /// Show scheduler and allocator statistics
    Runtime,
    /// Show all metrics
    Metrics,
    /// Return free allocator memory to the operating system
    Gc,
    /// Show or change logger levels
    Log {
        /// Logger (tracing target) names; ROOT for the root level
        #[arg(required = true)]
        loggers: Vec<String>,

        /// New level: ALL, TRACE, DEBUG, INFO, WARN, ERROR or OFF
        #[arg(short, long)]
        level: Option<String>,
    },
    /// Run an arbitrary task
    Task {
        name: String,

        /// Query parameters as key=value
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Ping => {
            let res = client.get(format!("{}/ping", base)).send().await?;
            print_text(res).await?;
        }
        Commands::Healthcheck => {
            let res = client.get(format!("{}/healthcheck", base)).send().await?;
            print_text(res).await?;
        }
        Commands::Runtime => {
            let res = client.get(format!("{}/runtime", base)).send().await?;
            print_text(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            print_json(res).await?;
        }
        Commands::Gc => {
            let res = client.post(format!("{}/tasks/gc", base)).send().await?;
            print_text(res).await?;
        }
        Commands::Log { loggers, level } => {
            let mut query: Vec<(&str, &str)> = loggers.iter().map(|l| ("logger", l.as_str())).collect();
            if let Some(level) = &level {
                query.push(("level", level.as_str()));
            }
            let res = client
                .post(format!("{}/tasks/log", base))
                .query(&query)
                .send()
                .await?;
            print_text(res).await?;
        }
        Commands::Task { name, params } => {
            let query: Vec<(&str, &str)> = params
                .iter()
                .map(|p| p.split_once('=').unwrap_or((p.as_str(), "")))
                .collect();
            let res = client
                .post(format!("{}/tasks/{}", base, name))
                .query(&query)
                .send()
                .await?;
            print_text(res).await?;
        }
    }

    Ok(())
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: admin returned status {}", status);
        eprint!("{}", body);
        return Ok(());
    }
    print!("{}", body);
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
