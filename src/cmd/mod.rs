//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `log`           | `Log`, `Ask`                                       |
//! | `entries`       | `List`, `Show`, `Search`, `Stats`                  |
//! | `review`        | `Review`                                           |
//! | `explore`       | `Explore`, `AutoExplore`, `Explorations`           |
//! | `backend`       | `TestBackend`                                      |
//! | `store`         | `Compact`                                          |
//! | `config`        | `Config`                                           |

pub mod backend;
pub mod config;
pub mod entries;
pub mod explore;
pub mod log;
pub mod review;
pub mod store;

pub use backend::cmd_test_backend;
pub use config::cmd_config;
pub use entries::{cmd_list, cmd_search, cmd_show, cmd_stats};
pub use explore::{
    cmd_auto_explore, cmd_explore, cmd_explorations, cmd_explore_recent, cmd_search_explorations,
};
pub use log::{cmd_ask, cmd_log};
pub use review::{ReviewSelection, cmd_review};
pub use store::cmd_compact;

use anyhow::{Context as _, Result, bail};
use serde::Serialize;
use uuid::Uuid;

use reflector::ReflectionAgent;
use reflector::backend::{Backend, create_backend};
use reflector::config::{CliOverrides, ReflectorConfig};

use super::Cli;

/// Everything a command needs: resolved configuration, the agent and the output mode.
pub struct Context {
    pub config: ReflectorConfig,
    pub agent: ReflectionAgent,
    pub json: bool,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let overrides = CliOverrides {
            log_dir: cli.log_dir.clone(),
            backend: cli.backend.clone(),
            model: cli.model.clone(),
        };
        let config = ReflectorConfig::resolve(cli.config.as_deref(), &overrides)?;
        for warning in config.validate() {
            tracing::warn!(%warning, "Configuration warning");
        }
        let agent = ReflectionAgent::open(&config);
        Ok(Self {
            config,
            agent,
            json: cli.json,
        })
    }

    /// Build the configured backend. Only commands that generate text call this.
    pub fn backend(&self) -> Result<Box<dyn Backend>> {
        create_backend(self.config.backend()).context("Failed to create backend")
    }

    /// Resolve a full id or a unique prefix of one to an entry id.
    pub fn resolve_entry_id(&self, input: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(input) {
            return Ok(id);
        }
        let prefix = input.trim().to_lowercase();
        if prefix.is_empty() {
            bail!("Entry id must not be empty");
        }

        let mut matches: Vec<Uuid> = Vec::new();
        for entry in self.agent.entries().read_all()? {
            let id = entry?.id;
            if id.to_string().starts_with(&prefix) {
                matches.push(id);
            }
        }

        match matches.as_slice() {
            [id] => Ok(*id),
            [] => bail!("No entry matches id '{}'", input),
            _ => bail!(
                "Id prefix '{}' is ambiguous ({} entries match)",
                input,
                matches.len()
            ),
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shorten text to `max` characters for one-line listings.
pub fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max && !text.contains('\n') {
        return line.to_string();
    }
    let head: String = line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}
