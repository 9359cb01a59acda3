use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "iris")]
#[command(about = "IRIS - Conversational visual intelligence with graceful degradation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one chat turn through the response gateway
    Chat {
        /// The user query for this turn
        #[arg(long)]
        query: String,
        /// Path to an image to pin to the session
        #[arg(long)]
        image: Option<PathBuf>,
        /// Analysis mode tag (e.g. storytelling, chart-interpretation)
        #[arg(long)]
        mode: Option<String>,
        /// Session id; a fresh one is minted when omitted
        #[arg(long)]
        session: Option<String>,
        /// User id; enables archive snapshots
        #[arg(long)]
        user: Option<String>,
    },
    /// List archived sessions for a user
    History {
        #[arg(long)]
        user: String,
    },
    /// Print the analysis mode registry
    Modes,
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

    match cli.command {
        Commands::Chat {
            query,
            image,
            mode,
            session,
            user,
        } => commands::chat::run(query, image, mode, session, user).await?,
        Commands::History { user } => commands::history::run(&user).await?,
        Commands::Modes => commands::modes::run(),
    }

    Ok(())
}
