use clap::{Parser, Subcommand};

pub mod config;
pub mod history;
pub mod init;
pub mod preview;
pub mod version;

#[derive(Parser)]
#[command(name = "arauto")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the Arauto WhatsApp broadcast service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how many contacts are eligible for a broadcast, with ETA
    Preview {
        /// Path to config file (default: adjacent to the WhatsApp store)
        #[arg(long)]
        config: Option<String>,
    },

    /// List recent broadcast audit records
    History {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: u32,

        /// Path to config file (default: adjacent to the WhatsApp store)
        #[arg(long)]
        config: Option<String>,
    },

    /// Create a default configuration file
    Init {
        /// Path for the config file (default: adjacent to the WhatsApp store)
        #[arg(long)]
        config: Option<String>,

        /// Path where the transport keeps its credential material
        #[arg(long)]
        store_path: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Preview { config } => preview::execute(config).await,
        Commands::History { limit, config } => history::execute(limit, config).await,
        Commands::Init {
            config,
            store_path,
            force,
        } => init::execute(config, store_path, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
