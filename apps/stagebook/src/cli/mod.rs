//! # Stagebook CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show row counts
//! - `init` - Initialize a new database
//! - `seed` - Load fictional sample data
//! - `project list|add|archive` - Manage projects
//! - `contact list|add` - Manage contacts
//! - `allocate` - Budget hours for a stage
//! - `log` - Log time against a project
//! - `burn` - Burn rate of one stage
//! - `performance` - Stage-by-stage breakdown of one project
//! - `portfolio` - Burn and risk across projects
//! - `directory add|list` - Project directory
//! - `export` / `import` - Snapshot files

mod commands;

use crate::config::{Backend, Config};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use stagebook_core::{ContactRole, ProjectStatus, RibaStage, StagebookError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stagebook - construction project tracking
///
/// Projects, RIBA stage budgets, timesheets and burn-rate risk.
#[derive(Parser, Debug)]
#[command(name = "stagebook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: ./stagebook.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the redb database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show row counts per table
    Status,

    /// Initialize a new empty database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Load fictional sample organisations, projects and timesheets
    Seed,

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Manage contacts
    Contact {
        #[command(subcommand)]
        command: ContactCommand,
    },

    /// Budget hours for a stage (returns the existing budget if already set)
    Allocate {
        /// Project job number
        job_number: String,

        /// RIBA stage (0-7, "S3", "stage 3")
        #[arg(short, long)]
        stage: RibaStage,

        /// Budgeted hours
        #[arg(long)]
        hours: f64,
    },

    /// Log time against a project
    Log {
        /// Project job number
        job_number: String,

        /// Hours worked (at most 24)
        #[arg(long)]
        hours: f64,

        /// RIBA stage (default: the project's current stage)
        #[arg(short, long)]
        stage: Option<RibaStage>,

        /// Date worked, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// What the time was spent on
        #[arg(short = 'm', long)]
        description: Option<String>,

        /// Who did the work
        #[arg(long)]
        by: Option<String>,
    },

    /// Burn rate and risk of one stage
    Burn {
        /// Project job number
        job_number: String,

        /// RIBA stage
        #[arg(short, long)]
        stage: RibaStage,
    },

    /// Stage-by-stage performance of one project
    Performance {
        /// Project job number
        job_number: String,
    },

    /// Burn rate and risk across projects
    Portfolio {
        /// Job numbers in display order (default: Active-status projects with hours allocated)
        job_numbers: Vec<String>,
    },

    /// Project directory
    Directory {
        #[command(subcommand)]
        command: DirectoryCommand,
    },

    /// Export every table to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (snapshot, json)
        #[arg(short = 't', long, default_value = "snapshot")]
        format: String,
    },

    /// Replace the database contents from an exported file
    Import {
        /// Input file path (snapshot or json)
        #[arg(short, long)]
        input: PathBuf,

        /// Overwrite a database that already holds rows
        #[arg(short, long)]
        force: bool,
    },
}

/// `project` subcommands.
#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List projects ordered by job number
    List {
        /// Include archived and deactivated projects
        #[arg(long)]
        include_inactive: bool,

        /// Only projects with this status
        #[arg(long)]
        status: Option<ProjectStatus>,
    },

    /// Create a project
    Add {
        /// Unique job number
        job_number: String,

        /// Project name
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Current RIBA stage (default: 0)
        #[arg(short, long)]
        stage: Option<RibaStage>,

        /// Client organisation id
        #[arg(long)]
        client: Option<u64>,
    },

    /// Mark a project archived and hide it from active views
    Archive {
        /// Project job number
        job_number: String,
    },
}

/// `contact` subcommands.
#[derive(Subcommand, Debug)]
pub enum ContactCommand {
    /// List contacts ordered by surname
    List {
        /// Case-insensitive match on name or email
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        include_inactive: bool,
    },

    /// Create a contact (returns the existing one if identical)
    Add {
        first_name: String,
        last_name: String,

        #[arg(long)]
        email: Option<String>,

        /// Organisation id
        #[arg(long)]
        organisation: Option<u64>,

        #[arg(long)]
        job_title: Option<String>,
    },
}

/// `directory` subcommands.
#[derive(Subcommand, Debug)]
pub enum DirectoryCommand {
    /// Add a contact to a project (returns the existing entry if present)
    Add {
        /// Project job number
        job_number: String,

        /// Contact id
        #[arg(long)]
        contact: u64,

        /// Role, e.g. "Architect" or "quantity-surveyor"
        #[arg(long)]
        role: ContactRole,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List a project's directory
    List {
        /// Project job number
        job_number: String,

        /// Only this role
        #[arg(long)]
        role: Option<ContactRole>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), StagebookError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    let json = cli.json_mode;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Server { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Commands::Status => cmd_status(&config, json),
        Commands::Init { force } => cmd_init(&config, force),
        Commands::Seed => cmd_seed(&config, json),
        Commands::Project { command } => match command {
            ProjectCommand::List {
                include_inactive,
                status,
            } => cmd_project_list(&config, json, include_inactive, status),
            ProjectCommand::Add {
                job_number,
                name,
                description,
                stage,
                client,
            } => cmd_project_add(&config, json, job_number, name, description, stage, client),
            ProjectCommand::Archive { job_number } => {
                cmd_project_archive(&config, json, &job_number)
            }
        },
        Commands::Contact { command } => match command {
            ContactCommand::List {
                search,
                include_inactive,
            } => cmd_contact_list(&config, json, search, include_inactive),
            ContactCommand::Add {
                first_name,
                last_name,
                email,
                organisation,
                job_title,
            } => cmd_contact_add(
                &config,
                json,
                first_name,
                last_name,
                email,
                organisation,
                job_title,
            ),
        },
        Commands::Allocate {
            job_number,
            stage,
            hours,
        } => cmd_allocate(&config, json, &job_number, stage, hours),
        Commands::Log {
            job_number,
            hours,
            stage,
            date,
            description,
            by,
        } => cmd_log(&config, json, &job_number, hours, stage, date, description, by),
        Commands::Burn { job_number, stage } => cmd_burn(&config, json, &job_number, stage),
        Commands::Performance { job_number } => cmd_performance(&config, json, &job_number),
        Commands::Portfolio { job_numbers } => cmd_portfolio(&config, json, &job_numbers),
        Commands::Directory { command } => match command {
            DirectoryCommand::Add {
                job_number,
                contact,
                role,
                notes,
            } => cmd_directory_add(&config, json, &job_number, contact, role, notes),
            DirectoryCommand::List { job_number, role } => {
                cmd_directory_list(&config, json, &job_number, role)
            }
        },
        Commands::Export { output, format } => cmd_export(&config, &output, &format),
        Commands::Import { input, force } => cmd_import(&config, &input, force),
    }
}
