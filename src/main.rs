//! Skyform CLI - declare and simulate the nginx-on-AKS stack

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use skyform::engine::{Deployment, Engine, NodeStatus};
use skyform::error::{Failure, FixSuggestion};
use skyform::provider::{MockCloudProvider, MockConnector};
use skyform::{declare_nginx_stack, StackConfig, StackInputs};

#[derive(Parser)]
#[command(name = "skyform")]
#[command(about = "Skyform - declarative provisioning graph with deferred outputs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Declare the stack and print its entries in dependency order
    Preview {
        /// Stack configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Page served by nginx
        #[arg(long, default_value = "index.html")]
        html: PathBuf,
    },

    /// Materialize the stack against the in-memory providers
    Up {
        /// Stack configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Page served by nginx
        #[arg(long, default_value = "index.html")]
        html: PathBuf,

        /// Write the event log as JSON
        #[arg(long)]
        events: Option<PathBuf>,

        /// Delete everything again once the exports resolved
        #[arg(long)]
        teardown: bool,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview { config, html } => preview(config.as_deref(), &html),
        Commands::Up {
            config,
            html,
            events,
            teardown,
        } => up(config.as_deref(), &html, events.as_deref(), teardown).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(node) = e.node() {
            eprintln!("  {} {} ({})", "Node:".yellow(), node, e.kind());
        }
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_inputs(config: Option<&Path>, html: &Path) -> Result<(StackConfig, StackInputs), Failure> {
    let config = match config {
        Some(path) => StackConfig::load(path)?,
        None => StackConfig::new(),
    }
    .with_env()?;
    let inputs = StackInputs::from_config(&config, html)?;
    Ok((config, inputs))
}

fn preview(config: Option<&Path>, html: &Path) -> Result<(), Failure> {
    let (_, inputs) = load_inputs(config, html)?;
    let graph = declare_nginx_stack(&inputs)?;
    let entries = graph.describe()?;

    println!(
        "{} Stack {} ({} entries)",
        "→".cyan(),
        graph.name().cyan().bold(),
        entries.len()
    );
    for entry in &entries {
        let deps: Vec<&str> = entry.dependencies.iter().map(|d| d.as_str()).collect();
        println!(
            "  {:<22} {:<36} {:<28} {}",
            entry.id.as_str().bold(),
            entry.entry.to_string(),
            entry.target.dimmed(),
            if deps.is_empty() {
                String::new()
            } else {
                format!("← {}", deps.join(", "))
            }
        );
    }
    for name in graph.export_names() {
        println!("  {} {}", "export".magenta(), name);
    }
    Ok(())
}

async fn up(
    config: Option<&Path>,
    html: &Path,
    events: Option<&Path>,
    teardown: bool,
) -> Result<(), Failure> {
    let (config, inputs) = load_inputs(config, html)?;
    let graph = declare_nginx_stack(&inputs)?;

    let engine = Engine::new(
        Arc::new(MockCloudProvider::new()),
        Arc::new(MockConnector::default()),
    )
    .with_poll_policy(config.poll_policy()?);

    println!("{} Provisioning {}", "→".cyan(), graph.name().cyan().bold());
    let deployment = engine.materialize(graph).await?;
    report(&deployment);

    if let Some(path) = events {
        let json = serde_json::to_string_pretty(&deployment.events().to_json())
            .map_err(skyform::SkyError::from)?;
        std::fs::write(path, json).map_err(skyform::SkyError::from)?;
        println!("  {} {}", "events written to".dimmed(), path.display());
    }

    if let Some(cause) = deployment.first_failure() {
        return Err(cause);
    }

    if teardown {
        engine.destroy(&deployment).await?;
        println!("{} Torn down", "✓".green());
    }
    Ok(())
}

fn report(deployment: &Deployment) {
    for id in deployment.order() {
        let Some(record) = deployment.record(id.as_str()) else {
            continue;
        };
        let mark = match &record.status {
            NodeStatus::Created | NodeStatus::Deleted => "✓".green(),
            NodeStatus::Failed(_) => "✗".red(),
            NodeStatus::Skipped(_) => "-".yellow(),
        };
        let detail = match (&record.status, record.provider()) {
            (NodeStatus::Failed(cause), _) => cause.to_string().red().to_string(),
            (NodeStatus::Skipped(_), _) => "skipped".yellow().to_string(),
            (_, Some(provider)) => format!("{} ({}ms)", provider, record.duration.as_millis())
                .dimmed()
                .to_string(),
            (_, None) => format!("{}ms", record.duration.as_millis()).dimmed().to_string(),
        };
        println!("  {} {:<22} {:<36} {}", mark, id.as_str(), record.entry.to_string(), detail);
    }

    for export in deployment.exports() {
        match &export.value {
            Ok(value) => {
                let shown = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                println!("{} {} = {}", "Output:".cyan().bold(), export.name, shown.bold());
            }
            Err(cause) => println!("{} {} unavailable: {}", "Output:".cyan().bold(), export.name, cause),
        }
    }
}
