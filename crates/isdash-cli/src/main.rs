use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "isdash")]
#[command(about = "isdash - Integration Services dashboard from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SearchKind {
    Identities,
    Channels,
}

#[derive(Subcommand)]
enum Commands {
    /// Search identities or channels, printing one JSON record per line
    Search {
        kind: SearchKind,
        /// DID, user type, username, channel address or topic source
        #[arg(default_value = "")]
        query: String,
        /// Number of records wanted up front
        #[arg(long)]
        limit: Option<usize>,
        /// Only records created by the logged-in identity
        #[arg(long)]
        mine: bool,
    },
    /// Follow a channel's messages
    Feed {
        address: String,
        /// How long to keep polling
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
    /// Store credentials for later commands
    Login {
        #[arg(long)]
        did: String,
        #[arg(long)]
        jwt: String,
    },
    /// Forget stored credentials
    Logout,
    /// Print the configuration file path and effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Respect RUST_LOG, default to "info"
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            kind,
            query,
            limit,
            mine,
        } => commands::search::run(kind, &query, limit, mine).await?,
        Commands::Feed { address, seconds } => commands::feed::run(&address, seconds).await?,
        Commands::Login { did, jwt } => commands::auth::login(&did, &jwt).await?,
        Commands::Logout => commands::auth::logout().await?,
        Commands::Config => commands::config::show()?,
    }

    Ok(())
}
