use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "reflector")]
#[command(version, about = "Self-reflection log for AI interactions")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding responses.jsonl and explorations.jsonl. Overrides reflector.toml.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Backend to use: claude, ollama, command, mock. Overrides reflector.toml.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Model passed to the backend. Overrides reflector.toml.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Path to the config file (defaults to ./reflector.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Format of diagnostic logs written to stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record an interaction that happened elsewhere
    Log {
        prompt: String,
        response: String,
        /// Model that produced the response (defaults to the backend's model)
        #[arg(long)]
        model_name: Option<String>,
    },
    /// Generate a response with the backend and log it
    Ask { prompt: String },
    /// List the most recent entries
    List {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show one entry with its review and explorations
    Show { id: String },
    /// Score, reflect on and revise entries
    Review {
        /// Entry ids (full or unique prefix)
        ids: Vec<String>,

        /// Review the most recent entries that are not fully reviewed
        #[arg(long, conflicts_with = "ids")]
        pending: bool,

        /// Maximum number of pending entries
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// With --pending, only entries without a score
        #[arg(long)]
        unscored: bool,

        /// With --pending, only entries without a reflection
        #[arg(long)]
        unreflected: bool,
    },
    /// Generate a follow-up prompt of one type from an entry
    Explore {
        id: String,
        /// Exploration type: deepen, alternative, application, critique, synthesis
        #[arg(short = 't', long = "type")]
        exploration_type: String,
    },
    /// Pick exploration types automatically for one entry or the most recent ones
    AutoExplore {
        /// Entry id; when omitted the most recent entries are explored
        id: Option<String>,

        /// Maximum explorations for a single entry (defaults to reflector.toml)
        #[arg(long)]
        max: Option<usize>,

        /// Number of recent entries (defaults to reflector.toml)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Explorations per recent entry (defaults to reflector.toml)
        #[arg(long)]
        per_entry: Option<usize>,
    },
    /// List stored explorations
    Explorations {
        /// Only explorations generated from this entry
        #[arg(long)]
        entry: Option<String>,
    },
    /// Case-insensitive search over entries or explorations
    Search {
        query: String,

        /// Entry field to search: prompt, response, model_name, reflection, revision, thinking_process
        #[arg(short, long, default_value = "prompt")]
        field: String,

        /// Search generated exploration prompts instead of entries
        #[arg(long)]
        explorations: bool,
    },
    /// Show aggregate statistics
    Stats,
    /// Check that the configured backend answers
    TestBackend,
    /// Rewrite the entry log without superseded lines
    Compact,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default reflector.toml file
    Init,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_filter = if verbose { "reflector=debug,warn" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    // Config commands work on the file itself and must not fail on a bad layer.
    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&cli, command.clone());
    }

    let ctx = cmd::Context::new(&cli)?;

    match &cli.command {
        Commands::Log {
            prompt,
            response,
            model_name,
        } => cmd::cmd_log(&ctx, prompt, response, model_name.as_deref())?,
        Commands::Ask { prompt } => cmd::cmd_ask(&ctx, prompt)?,
        Commands::List { limit } => cmd::cmd_list(&ctx, *limit)?,
        Commands::Show { id } => cmd::cmd_show(&ctx, id)?,
        Commands::Review {
            ids,
            pending,
            limit,
            unscored,
            unreflected,
        } => {
            let selection = if *pending {
                cmd::ReviewSelection::Pending {
                    limit: *limit,
                    unscored: *unscored,
                    unreflected: *unreflected,
                }
            } else {
                cmd::ReviewSelection::Ids(ids.clone())
            };
            cmd::cmd_review(&ctx, selection)?
        }
        Commands::Explore {
            id,
            exploration_type,
        } => cmd::cmd_explore(&ctx, id, exploration_type)?,
        Commands::AutoExplore {
            id,
            max,
            limit,
            per_entry,
        } => match id {
            Some(id) => cmd::cmd_auto_explore(&ctx, id, *max)?,
            None => cmd::cmd_explore_recent(&ctx, *limit, *per_entry)?,
        },
        Commands::Explorations { entry } => cmd::cmd_explorations(&ctx, entry.as_deref())?,
        Commands::Search {
            query,
            field,
            explorations,
        } => {
            if *explorations {
                cmd::cmd_search_explorations(&ctx, query)?
            } else {
                cmd::cmd_search(&ctx, query, field)?
            }
        }
        Commands::Stats => cmd::cmd_stats(&ctx)?,
        Commands::TestBackend => cmd::cmd_test_backend(&ctx)?,
        Commands::Compact => cmd::cmd_compact(&ctx)?,
        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}
