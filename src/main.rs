use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nl_orchestrator::extraction::ResponseExtractor;
use nl_orchestrator::persistence::HistoryStore;
use nl_orchestrator::{Agent, Config, Outcome};

#[derive(Parser)]
#[command(name = "nl-orchestrator")]
#[command(about = "Turns natural-language commands into tool calls", long_about = None)]
struct Cli {
    /// Directory file and shell tools operate in (overrides config)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan and execute one command
    Run {
        #[arg(required = true, trailing_var_arg = true)]
        utterance: Vec<String>,
    },
    /// Split a command on separator words and execute every segment
    Sequence {
        #[arg(required = true, trailing_var_arg = true)]
        utterance: Vec<String>,
    },
    /// Read LLM output from stdin and print the extracted command
    Extract {
        /// Execute the extracted command instead of printing it
        #[arg(long)]
        execute: bool,
    },
    /// Start an interactive session
    Repl,
    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
    /// Show persisted history
    History {
        /// Number of most recent entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nl_orchestrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(path) = cli.path {
        config.tools.working_dir = path;
    }

    match cli.command {
        Commands::Run { utterance } => {
            let mut agent = Agent::new(config)?;
            let outcome = agent.handle(&utterance.join(" ")).await;
            print_outcome(&outcome)?;
        }
        Commands::Sequence { utterance } => {
            let mut agent = Agent::new(config)?;
            let outcome = agent.run_sequence(&utterance.join(" ")).await;
            print_outcome(&outcome)?;
        }
        Commands::Extract { execute } => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;

            if execute {
                let mut agent = Agent::new(config)?;
                let outcome = agent.run_ai_response(&text).await;
                print_outcome(&outcome)?;
            } else {
                let extraction = ResponseExtractor::new().extract(&text);
                println!("{}", serde_json::to_string_pretty(&extraction)?);
            }
        }
        Commands::Repl => run_repl(config).await?,
        Commands::Config { show } => handle_config(&config, show)?,
        Commands::History { limit } => show_history(&config, limit)?,
    }

    Ok(())
}

fn print_outcome(outcome: &Outcome) -> Result<()> {
    if let Some(plan) = &outcome.plan {
        for step in &plan.steps {
            tracing::debug!("{} {}", step.status.icon(), step.action);
        }
    }
    println!("{}", serde_json::to_string_pretty(&outcome.envelope.to_value())?);
    if !outcome.is_success() {
        if let Some(report) = &outcome.report {
            eprintln!("{}", report);
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run_repl(config: Config) -> Result<()> {
    let mut agent = Agent::new(config)?;

    println!("nl-orchestrator");
    println!("Prefix a line with 'seq ' to run it as a sequence.");
    println!("Type 'exit' or 'quit' to end the session\n");

    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "exit" || input == "quit" {
            println!("Goodbye!");
            break;
        }

        let outcome = match input.strip_prefix("seq ") {
            Some(sequence) => agent.run_sequence(sequence).await,
            None => agent.handle(input).await,
        };
        match &outcome.report {
            Some(report) if !outcome.is_success() => println!("{}", report),
            _ => println!("{}", outcome.envelope.text()),
        }
    }

    if let Some(dir) = &agent.config().history.persist_dir {
        let path = dir.join("state").join(format!("{}.json", agent.id()));
        if let Err(e) = agent.save_state(&path) {
            tracing::warn!("Failed to save agent state: {:#}", e);
        }
    }

    Ok(())
}

fn handle_config(config: &Config, show: bool) -> Result<()> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    // Command-line overrides are never persisted
    let path = Config::config_path()?;
    if Config::write_default_if_missing(&path)? {
        println!("Default configuration written to: {}", path.display());
    } else {
        println!("Configuration file: {}", path.display());
    }
    println!("Use --show to view current configuration.");

    Ok(())
}

fn show_history(config: &Config, limit: Option<usize>) -> Result<()> {
    let Some(dir) = &config.history.persist_dir else {
        println!("History is not persisted. Set [history] persist_dir in the configuration.");
        return Ok(());
    };

    let entries = HistoryStore::new(dir).load(limit)?;
    if entries.is_empty() {
        println!("No history yet.");
    }
    for entry in entries {
        println!(
            "#{} {} {} -> {}",
            entry.step_number,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.command,
            entry.result
        );
    }

    Ok(())
}
