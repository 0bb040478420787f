use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod reminders_cmd;
mod render;
mod state;
mod store;
mod tz;

use reminders_cmd::RemindersCommand;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("NAPOMNI_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "napomni", version = VERSION, about = "Reminders from plain Russian commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a command and print the result as JSON without storing it
    Parse {
        /// Command text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Reference time "YYYY-MM-DD HH:MM" in the configured zone (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Manage stored reminders
    Reminders {
        #[command(subcommand)]
        command: RemindersCommand,
    },

    /// Config file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.napomni/config.toml with defaults (never overwrites)
    Init,

    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Config { command } = &cli.command {
        init_tracing("info");
        return match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => config::show_config(),
        };
    }

    let cfg = config::load_config()?;
    init_tracing(&cfg.log.filter);

    match cli.command {
        Command::Parse { text, at } => parse_cmd(&text.join(" "), at.as_deref(), &cfg)?,
        Command::Reminders { command } => reminders_cmd::run(command, &cfg).await?,
        Command::Config { .. } => {}
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr.
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_cmd(text: &str, at: Option<&str>, cfg: &config::Config) -> Result<()> {
    let reference = match at {
        Some(at) => NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M")
            .with_context(|| format!("invalid --at {at:?}, expected YYYY-MM-DD HH:MM"))?,
        None => cfg.zone()?.now_local(),
    };

    let parsed = napomni_core::parse(text, reference, cfg.parser_defaults())
        .with_context(|| format!("could not parse {text:?}"))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&parsed).context("serialize parse result")?
    );
    Ok(())
}
