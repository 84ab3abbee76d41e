use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tether::commands::{
    cmd_check, cmd_config_get, cmd_config_set, cmd_config_show, cmd_link, cmd_search,
    cmd_show, cmd_similar, cmd_unlink,
};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Keep Zendesk linked tickets in sync on both sides")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link two tickets to each other
    Link {
        /// Current ticket ID
        source: String,

        /// Ticket ID to link
        target: String,

        /// Comment added to the internal audit note on both tickets
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Remove the link between two tickets
    Unlink {
        /// Current ticket ID
        source: String,

        /// Linked ticket ID to remove
        target: String,
    },

    /// Display a ticket with its linked tickets
    #[command(visible_alias = "s")]
    Show {
        /// Ticket ID
        id: String,
    },

    /// Search tickets by text
    Search {
        /// Search text
        query: String,

        /// Hide the given ticket and tickets already linked to it
        #[arg(long, value_name = "ID")]
        exclude_linked_of: Option<String>,

        /// Maximum results to show
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },

    /// List unlinked tickets with a similar subject
    Similar {
        /// Ticket ID
        id: String,
    },

    /// Report links that are missing on the other ticket
    Check {
        /// Ticket ID
        id: String,

        /// Write the missing back-links
        #[arg(long)]
        repair: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Key, e.g. linked_field.id
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Key, e.g. zendesk.base_url
        key: String,

        /// Value
        value: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("TETHER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output_json = cli.json;
    let result = match cli.command {
        Commands::Link {
            source,
            target,
            comment,
        } => cmd_link(&source, &target, comment.as_deref(), output_json).await,
        Commands::Unlink { source, target } => cmd_unlink(&source, &target, output_json).await,
        Commands::Show { id } => cmd_show(&id, output_json).await,
        Commands::Search {
            query,
            exclude_linked_of,
            limit,
        } => cmd_search(&query, exclude_linked_of.as_deref(), limit, output_json).await,
        Commands::Similar { id } => cmd_similar(&id, output_json).await,
        Commands::Check { id, repair } => cmd_check(&id, repair, output_json).await,

        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(output_json),
            ConfigAction::Get { key } => cmd_config_get(&key, output_json),
            ConfigAction::Set { key, value } => cmd_config_set(&key, &value, output_json),
        },
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
