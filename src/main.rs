use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use blueprint_chat::chat::SessionOptions;
use blueprint_chat::cli::{history, query, replay, schema};
use blueprint_chat::config::Config;
use blueprint_chat::query::SearchOptions;
use blueprint_chat::schema::{load_schema, AdapterRegistry};
use blueprint_chat::store::TranscriptStore;

#[derive(Parser)]
#[command(name = "blueprint")]
#[command(about = "Blueprint query builder and streaming chat transcript tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "blueprint.yaml")]
    config: String,

    /// Override the blueprint file from the config
    #[arg(short, long)]
    schema: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the loaded blueprint
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Build GraphQL queries from the blueprint
    Query {
        #[command(subcommand)]
        command: QueryCommands,
    },

    /// Replay a recorded event stream (one JSON frame per line)
    Replay {
        /// Path to the recorded stream
        file: PathBuf,

        /// Message sent once the session is authenticated
        #[arg(long)]
        initial: Option<String>,

        /// Store the assembled transcript
        #[arg(long)]
        save: bool,

        /// Title for the stored conversation
        #[arg(long)]
        title: Option<String>,

        /// Show tool arguments and results
        #[arg(long)]
        tools: bool,
    },

    /// Stored conversations
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Print entities, fields and relationships
    Show,
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Fetch every scalar field of one entity
    Entity {
        /// Entity name
        name: String,
        /// Print the request body as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search display fields across all entities
    Search {
        /// Search term
        #[arg(short, long, default_value = "")]
        term: String,
        #[arg(long)]
        json: bool,
    },
    /// Fetch one node and its related entities
    Connections {
        /// Entity name
        name: String,
        /// Node identifier
        #[arg(long)]
        node_id: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List stored conversations
    List,
    /// Read a stored conversation
    Read {
        /// Conversation ID (short prefix or full UUID)
        id: String,
        /// Show tool arguments and results
        #[arg(long)]
        tools: bool,
    },
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("blueprint_chat={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).unwrap_or_default();
    init_tracing(&config.logging.level);

    if let Some(path) = cli.schema {
        config.schema.path = path.display().to_string();
    }

    match cli.command {
        Commands::Schema { command } => {
            let registry = AdapterRegistry::new();
            let (blueprint, adapter) =
                load_schema(&registry, &config.schema_path(), config.schema_format())?;
            match command {
                SchemaCommands::Show => schema::show(&blueprint, adapter)?,
            }
        }
        Commands::Query { command } => {
            let registry = AdapterRegistry::new();
            let (blueprint, _) =
                load_schema(&registry, &config.schema_path(), config.schema_format())?;
            match command {
                QueryCommands::Entity { name, json } => query::entity(&blueprint, &name, json)?,
                QueryCommands::Search { term, json } => {
                    let options = SearchOptions::from(&config.search);
                    query::search(&blueprint, &options, &term, json)?;
                }
                QueryCommands::Connections {
                    name,
                    node_id,
                    json,
                } => query::connections(&blueprint, &name, &node_id, json)?,
            }
        }
        Commands::Replay {
            file,
            initial,
            save,
            title,
            tools,
        } => {
            let store = if save {
                Some(TranscriptStore::open(&config.database_path())?)
            } else {
                None
            };
            let options = replay::ReplayOptions {
                initial,
                save: store.as_ref().map(|s| (s, title)),
                tools,
            };
            replay::run(&file, SessionOptions::from(&config.stream), options)?;
        }
        Commands::History { command } => {
            let store = TranscriptStore::open(&config.database_path())?;
            match command {
                HistoryCommands::List => history::list(&store)?,
                HistoryCommands::Read { id, tools } => history::read(&store, &id, tools)?,
            }
        }
    }

    Ok(())
}
