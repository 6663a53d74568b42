use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use soql_workbench::cli;
use soql_workbench::cli::commands::{BuildArgs, RunArgs};
use soql_workbench::config::Config;
use soql_workbench::export::ExportFormat;
use soql_workbench::logging;

#[derive(Parser)]
#[command(name = "sfq")]
#[command(author, version, about = "SOQL Workbench - build, check and run Salesforce queries")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,

    /// List sObjects
    Objects {
        /// Only objects whose name starts with this prefix
        prefix: Option<String>,

        /// Fetch the list from the org instead of the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Describe an object's fields and cache them
    Describe {
        object: String,
    },

    /// Compose a query from a state file and/or flags
    Build {
        /// JSON or YAML builder state to start from
        #[arg(long)]
        state: Option<PathBuf>,

        /// Object to query
        #[arg(long, short = 'o')]
        object: Option<String>,

        /// Fields to select (comma separated or repeated)
        #[arg(long, short = 'f', value_delimiter = ',')]
        fields: Vec<String>,

        /// Condition such as "Name = Acme"; prefix "[group]" to group conditions
        #[arg(long = "where", short = 'w')]
        conditions: Vec<String>,

        /// Join conditions and groups with OR instead of AND
        #[arg(long)]
        or: bool,

        /// Sort key such as "CreatedDate DESC"
        #[arg(long)]
        order_by: Vec<String>,

        #[arg(long)]
        limit: Option<u32>,

        /// Validate and analyze the result against cached metadata
        #[arg(long)]
        check: bool,
    },

    /// Show performance suggestions for a query
    Analyze {
        query: String,
    },

    /// Validate a query against cached metadata
    Validate {
        query: String,
    },

    /// Autocomplete a partial query
    Suggest {
        partial: String,
    },

    /// Execute a query
    Run {
        query: Option<String>,

        /// Run a saved query by id or name
        #[arg(long, conflicts_with = "query")]
        saved: Option<String>,

        /// Skip validation
        #[arg(long)]
        force: bool,

        /// Output format
        #[arg(long, value_enum)]
        export: Option<ExportFormat>,

        /// Write the output to a file
        #[arg(long, short = 'O')]
        output: Option<PathBuf>,
    },

    /// Manage saved queries
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },

    /// Show or clear query history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Update records in bulk
    Update {
        object: String,

        /// Record ids (comma separated or repeated)
        #[arg(long, required = true, value_delimiter = ',')]
        ids: Vec<String>,

        /// Field assignment such as Rating=Hot
        #[arg(long = "set", required = true)]
        assignments: Vec<String>,
    },

    /// Delete records in bulk
    Delete {
        object: String,

        /// Record ids (comma separated or repeated)
        #[arg(long, required = true, value_delimiter = ',')]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum SavedAction {
    /// List saved queries, newest first
    List,

    /// Save a query under a name
    Save {
        name: String,
        query: String,
    },

    /// Print a saved query
    Show {
        /// Id or name
        id: String,
    },

    /// Delete a saved query
    Delete {
        /// Id or name
        id: String,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List recent queries
    List {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Remove all history entries
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose)?;

    if let Commands::Init = cli.command {
        return cli::commands::init(cli.config.as_deref());
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Objects { prefix, refresh } => cli::commands::objects(&config, prefix.as_deref(), refresh),
        Commands::Describe { object } => cli::commands::describe(&config, &object),
        Commands::Build {
            state,
            object,
            fields,
            conditions,
            or,
            order_by,
            limit,
            check,
        } => cli::commands::build(
            &config,
            BuildArgs {
                state,
                object,
                fields,
                conditions,
                or,
                order_by,
                limit,
                check,
            },
        ),
        Commands::Analyze { query } => cli::commands::analyze(&config, &query),
        Commands::Validate { query } => cli::commands::validate(&config, &query),
        Commands::Suggest { partial } => cli::commands::suggest(&config, &partial),
        Commands::Run {
            query,
            saved,
            force,
            export,
            output,
        } => cli::commands::run(
            &config,
            RunArgs {
                query,
                saved,
                force,
                export,
                output,
            },
        ),
        Commands::Saved { action } => match action {
            SavedAction::List => cli::commands::saved_list(&config),
            SavedAction::Save { name, query } => cli::commands::saved_save(&config, &name, &query),
            SavedAction::Show { id } => cli::commands::saved_show(&config, &id),
            SavedAction::Delete { id } => cli::commands::saved_delete(&config, &id),
        },
        Commands::History { action } => match action {
            HistoryAction::List { limit } => cli::commands::history_list(&config, limit),
            HistoryAction::Clear => cli::commands::history_clear(&config),
        },
        Commands::Update {
            object,
            ids,
            assignments,
        } => cli::commands::update(&config, &object, &ids, &assignments),
        Commands::Delete { object, ids } => cli::commands::delete(&config, &object, &ids),
    }
}
