use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "buggyfocus", version, about = "Buggy Focus CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a focus session in the foreground
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Print a line from the bug
    Snark(commands::snark::SnarkArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Hosts file maintenance
    Hosts {
        #[command(subcommand)]
        action: commands::hosts::HostsAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Snark(args) => commands::snark::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Hosts { action } => commands::hosts::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "buggyfocus", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_logging() {
    let level = if std::env::var_os("BUGGYFOCUS_DEBUG_LOG").is_some() {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("buggyfocus_core={level},buggyfocus={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
