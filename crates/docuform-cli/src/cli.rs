//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Docuform: fill DOCX templates and look up student records
#[derive(Parser, Debug)]
#[command(name = "docuform", version)]
#[command(about = "Fill DOCX templates from form values and student records", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// More log output (-v debug, -vv trace); `RUST_LOG` takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides `server.host`)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides `server.port`)
        #[arg(long)]
        port: Option<u16>,
    },

    /// List the fields a template asks for
    Fields {
        /// Template file
        file: PathBuf,
        /// Print JSON instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// Render a template to DOCX or PDF
    Render {
        /// Template file
        file: PathBuf,
        /// JSON file with field values
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// A single value, `key=value` (repeatable; dotted keys nest)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Pre-fill values from this student's record first
        #[arg(long)]
        student: Option<String>,
        /// Output file
        #[arg(short, long)]
        out: PathBuf,
        /// Convert to PDF (implied by a `.pdf` output name)
        #[arg(long)]
        pdf: bool,
    },

    /// Build a DOCX template from simple HTML
    FromHtml {
        /// HTML file
        input: PathBuf,
        /// Output DOCX file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Look up or search student records
    Student {
        /// Student id
        #[arg(required_unless_present = "search")]
        id: Option<String>,
        /// Search by name instead
        #[arg(short, long, conflicts_with = "id")]
        search: Option<String>,
        /// Maximum search results
        #[arg(long, default_value_t = docuform_records::DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Print a value by dotted key (e.g. `server.port`)
    Get {
        /// Dotted key
        key: String,
    },
    /// Set a value by dotted key in the config file
    Set {
        /// Dotted key
        key: String,
        /// New value (bool, integer, float, or string)
        value: String,
    },
    /// Write a default config file
    Init {
        /// Where to write it (defaults to the platform config dir)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration as environment variables
    Export {
        /// Format as `--env KEY=value` for `docker run`
        #[arg(long)]
        docker_env: bool,
    },
}
