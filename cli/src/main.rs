use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use console::style;
use ptc_core::agent::{AgentLoop, RunOptions, RunResult, RunStop, ToolRegistry};
use ptc_core::traits::Provider;
use ptc_core::{config, providers};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod demo;
mod onboard;

use demo::DemoSet;

#[derive(Parser)]
#[command(name = "ptc")]
#[command(about = "ptc - programmatic tool calling client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive configuration
    Onboard,
    /// Run one request against a demo tool set
    Run {
        #[arg(short, long)]
        message: String,
        #[arg(short, long)]
        system: Option<String>,
        /// Reuse an existing container
        #[arg(short, long)]
        container: Option<String>,
        #[arg(short, long, value_enum, default_value_t = DemoSet::Basic)]
        demo: DemoSet,
    },
    /// Run one of the scripted demo scenarios
    Demo {
        #[arg(value_enum)]
        example: DemoSet,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None if !config::config_exists() => Commands::Onboard,
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Run {
            message,
            system,
            container,
            demo,
        } => {
            let mut options = RunOptions::default();
            options.system = system;
            options.session = container;
            run_request(&message, options, demo).await?;
        }
        Commands::Demo { example } => {
            run_request(example.prompt(), RunOptions::default(), example).await?;
        }
    }

    Ok(())
}

async fn run_request(message: &str, options: RunOptions, demo: DemoSet) -> Result<()> {
    let config = config::Config::load_or_init()?;
    let provider: Arc<dyn Provider> = Arc::from(providers::create_provider(&config)?);

    let registry = ToolRegistry::new().with_caller_enforcement(config.caller_enforcement);
    demo.register(&registry);

    let agent_loop = AgentLoop::new(provider, Arc::new(registry))
        .with_code_execution_type(config.code_execution_type.clone())
        .with_expiry_buffer(config.expiry_buffer())
        .with_budget(config.budget())
        .with_concurrent_dispatch(config.concurrent_tools);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!("\n🤔 Processing...\n");
    match agent_loop.run(message, options.with_cancel(cancel)).await {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            anyhow::bail!("Run failed: {}", e);
        }
    }
}

fn print_result(result: &RunResult) {
    println!("{}", style("=".repeat(60)).dim());
    match &result.stop {
        RunStop::EndTurn => {}
        RunStop::Unexpected(reason) => {
            println!("{} Stopped early: {}", style("!").yellow(), reason);
        }
        RunStop::BudgetExceeded(kind) => {
            println!("{} Budget exceeded: {}", style("!").yellow(), kind);
        }
    }
    println!("{}", style("Final answer:").white().bold());
    println!("{}", result.text);
    println!();
    println!(
        "  {} Tool calls: {}",
        style("→").green(),
        result.tool_calls_made
    );
    println!(
        "  {} Tokens: {} in / {} out",
        style("→").green(),
        result.total_input_tokens,
        result.total_output_tokens
    );
    if let Some(container) = &result.session_handle {
        println!(
            "  {} Container: {} (pass --container to reuse)",
            style("→").green(),
            style(container).cyan()
        );
    }
}
