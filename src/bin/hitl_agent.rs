//! hitl-agent: serve the lead workflow over HTTP, or run the blog pipeline once.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use hitl_agent::config::get_settings;
use hitl_agent::telemetry::{init_telemetry, TelemetryConfig};
use hitl_agent::{server, wiring};

/// Agentic outreach and blog workflows with human approval
#[derive(Parser)]
#[command(name = "hitl-agent", version, about)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true, env = "HITL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP entry point for the sales-outreach workflow
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        bind: Option<String>,
    },

    /// Write a blog post about a topic and send it for review
    Blog {
        /// Topic of the blog post
        topic: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = get_settings(cli.config.as_deref()).context("failed to load settings")?;
    init_telemetry(TelemetryConfig::from(&settings.logger))
        .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {}", e))?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            let state = wiring::build_app_state(&settings).context("failed to build services")?;

            println!("{} {}", "hitl-agent listening on".bold().green(), bind);
            server::serve(state, &bind).await?;
        }
        Commands::Blog { topic } => {
            let pipeline = wiring::build_blog_pipeline(&settings).context("failed to build services")?;

            println!("{} {}", "Writing a blog post about".bold(), topic);
            let outcome = pipeline.run(&topic).await?;

            println!("\n{}\n", outcome.final_message);
            match outcome.review_link {
                Some(link) => println!("{} {}", "Review:".bold().green(), link),
                None => println!("{}", "No review was requested".bold().yellow()),
            }
        }
    }

    Ok(())
}
