//! # Scholia CLI Module
//!
//! This module implements the CLI interface for Scholia.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new database
//! - `status` - Show record counts
//! - `schema` - List the installed types
//! - `add-author`, `add-affiliation`, `add-domain`, `add-entity` - Add records
//! - `add-article` - Add an article with references and signatures from JSON
//! - `article`, `update-article`, `delete-article` - Read, update, delete an article
//! - `add-definition`, `add-contribution`, `delete-problem` - Problem tree
//! - `link-evolution`, `add-improvement` - Entity relations
//! - `chain`, `improvements`, `solutions`, `neighbors` - Traversals
//! - `backup` - Copy the database file

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use scholia_core::{EntityRole, ScholiaError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Scholia - research knowledge base
///
/// A typed property graph of articles, references, authors and the
/// entities, problems and improvements they describe.
#[derive(Parser, Debug)]
#[command(name = "scholia")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ./scholia.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Log filter directive (overrides the config file)
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply(&self, mut config: Config) -> Result<Config, ScholiaError> {
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter = filter.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new database with the research schema
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show record counts
    Status,

    /// List the installed types
    Schema,

    /// Add an author
    AddAuthor {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Add an affiliation
    AddAffiliation {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        country: Option<String>,
    },

    /// Add a research domain
    AddDomain {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Add an abstract entity, a real entity or a problem
    AddEntity {
        /// entity, object, algorithm, problem, definition, contribution, improvement
        #[arg(short, long, value_parser = parse_role)]
        role: EntityRole,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Add an article from a JSON file
    AddArticle {
        /// Path to the article JSON
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show an article with its references and signatures
    Article {
        #[arg(long)]
        id: String,
    },

    /// Replace an article's fields from a JSON file
    UpdateArticle {
        #[arg(long)]
        id: String,
        /// Path to the fields JSON (title, year, venue, doi)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete an article with its references and signatures
    DeleteArticle {
        #[arg(long)]
        id: String,
    },

    /// Add a definition refining a problem
    AddDefinition {
        #[arg(short, long)]
        problem: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Add a contribution solving a definition
    AddContribution {
        #[arg(long)]
        definition: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a problem with its definitions
    DeleteProblem {
        #[arg(long)]
        id: String,
    },

    /// Record that one abstract entity evolved into another
    LinkEvolution {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Add an improvement advancing an abstract entity
    AddImprovement {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Abstract entity the improvement advances
        #[arg(short, long)]
        target: String,
        /// Abstract entities the improvement builds on (repeatable)
        #[arg(short, long)]
        origin: Vec<String>,
    },

    /// Follow a relation outwards from a node, cycle-safe
    Chain {
        #[arg(short, long)]
        start: String,
        /// Relation typename
        #[arg(short, long, default_value = "evolve")]
        rel: String,
    },

    /// Walk improvements backwards from a real entity
    Improvements {
        #[arg(short, long)]
        entity: String,
    },

    /// Definitions refining a problem and the contributions solving them
    Solutions {
        #[arg(short, long)]
        problem: String,
    },

    /// Every node one relation away
    Neighbors {
        #[arg(short, long)]
        node: String,
    },

    /// Copy the database to a new file
    Backup {
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_role(raw: &str) -> Result<EntityRole, String> {
    EntityRole::parse(raw).map_err(|e| e.to_string())
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), ScholiaError> {
    let db = config.database.as_path();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(db, force),
        Some(Commands::Status) | None => cmd_status(db, json_mode),
        Some(Commands::Schema) => cmd_schema(db, json_mode),
        Some(Commands::AddAuthor { name, email }) => cmd_add_author(db, json_mode, name, email),
        Some(Commands::AddAffiliation { name, country }) => {
            cmd_add_affiliation(db, json_mode, name, country)
        }
        Some(Commands::AddDomain { name, description }) => {
            cmd_add_domain(db, json_mode, name, description)
        }
        Some(Commands::AddEntity {
            role,
            name,
            description,
        }) => cmd_add_entity(db, json_mode, role, name, description),
        Some(Commands::AddArticle { file }) => cmd_add_article(db, json_mode, &file),
        Some(Commands::Article { id }) => cmd_article(db, json_mode, &id),
        Some(Commands::UpdateArticle { id, file }) => {
            cmd_update_article(db, json_mode, &id, &file)
        }
        Some(Commands::DeleteArticle { id }) => cmd_delete_article(db, json_mode, &id),
        Some(Commands::AddDefinition {
            problem,
            name,
            description,
        }) => cmd_add_definition(db, json_mode, &problem, name, description),
        Some(Commands::AddContribution {
            definition,
            name,
            description,
        }) => cmd_add_contribution(db, json_mode, &definition, name, description),
        Some(Commands::DeleteProblem { id }) => cmd_delete_problem(db, json_mode, &id),
        Some(Commands::LinkEvolution { from, to }) => {
            cmd_link_evolution(db, json_mode, &from, &to)
        }
        Some(Commands::AddImprovement {
            name,
            description,
            target,
            origin,
        }) => cmd_add_improvement(db, json_mode, name, description, &target, &origin),
        Some(Commands::Chain { start, rel }) => cmd_chain(db, json_mode, &start, &rel),
        Some(Commands::Improvements { entity }) => cmd_improvements(db, json_mode, &entity),
        Some(Commands::Solutions { problem }) => cmd_solutions(db, json_mode, &problem),
        Some(Commands::Neighbors { node }) => cmd_neighbors(db, json_mode, &node),
        Some(Commands::Backup { output }) => cmd_backup(db, json_mode, &output),
    }
}
