//! Apeiron CLI: the main entry point.
//!
//! Commands:
//! - `onboard` - Write a default config file
//! - `topics`  - List or search the catalog
//! - `random`  - Jump to a random topic
//! - `show`    - Deep dive into one topic
//! - `oracle`  - Talk to a concept

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "apeiron",
    about = "Apeiron — an archive of endless computer science rabbit holes",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// List catalog topics
    Topics {
        /// Only show topics whose title, description or id contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Open a random topic
    Random,

    /// Show the deep dive for a topic
    Show {
        /// Topic id, e.g. `quantum-computing`
        id: String,

        /// Display title used when the topic has to be generated
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Speak with the concept itself
    Oracle {
        /// Topic id or title
        topic: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Topics { search } => commands::topics::run(search).await?,
        Commands::Random => commands::random::run().await?,
        Commands::Show { id, title } => commands::show::run(&id, title).await?,
        Commands::Oracle { topic, message } => commands::oracle::run(&topic, message).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_title() {
        let cli = Cli::try_parse_from(["apeiron", "show", "he", "--title", "Homomorphic Encryption"])
            .unwrap();
        match cli.command {
            Commands::Show { id, title } => {
                assert_eq!(id, "he");
                assert_eq!(title.as_deref(), Some("Homomorphic Encryption"));
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn parses_oracle_single_message() {
        let cli = Cli::try_parse_from(["apeiron", "-v", "oracle", "entropy", "-m", "Why?"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Oracle { ref topic, message: Some(ref m) } if topic == "entropy" && m == "Why?"
        ));
    }

    #[test]
    fn show_requires_an_id() {
        assert!(Cli::try_parse_from(["apeiron", "show"]).is_err());
    }
}
