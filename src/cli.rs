use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ovc")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Converge HPE OneView, Image Streamer and ICsp resources to a desired state",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Appliance configuration file (JSON or TOML)
    #[arg(short, long, global = true, env = "OVC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile one resource to a desired state
    Apply(ApplyArgs),

    /// Gather facts about resources of a kind
    Facts(FactsArgs),

    /// List the supported resource kinds
    Kinds,

    /// ICsp OS provisioning
    #[command(subcommand)]
    Icsp(IcspCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared arguments
// ============================================================================

/// Desired-state document and the reference shorthands.
#[derive(Args, Clone, Default)]
pub struct DataArgs {
    /// Desired state: a JSON/TOML file, `-` for stdin, or inline JSON
    #[arg(short, long)]
    pub data: Option<String>,

    /// Natural-key value (usually the resource name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Resource URI
    #[arg(short, long)]
    pub uri: Option<String>,
}

// ============================================================================
// Apply / Facts
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Resource kind (see `ovc kinds`)
    pub kind: String,

    /// Desired state: present, absent or a kind-specific verb
    #[arg(short, long, default_value = "present")]
    pub state: String,

    #[command(flatten)]
    pub data: DataArgs,

    /// Report what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Show a diff of the change
    #[arg(long)]
    pub diff: bool,

    /// Do not send If-Match on updates
    #[arg(long)]
    pub no_validate_etag: bool,
}

#[derive(Args)]
pub struct FactsArgs {
    /// Resource kind (see `ovc kinds`)
    pub kind: String,

    /// Resource name; without it every resource of the kind is listed
    #[arg(short, long)]
    pub name: Option<String>,

    /// Resource URI
    #[arg(short, long, conflicts_with = "name")]
    pub uri: Option<String>,

    /// Sub-fact to gather (repeatable)
    #[arg(short, long = "option")]
    pub option: Vec<String>,

    /// Sub-facts as JSON, e.g. '[{"utilization": {"fields": "AveragePower"}}]'
    #[arg(long, conflicts_with = "option")]
    pub options: Option<String>,

    /// Listing parameters as JSON: start, count, filter, sort, query, fields, view
    #[arg(short, long)]
    pub params: Option<String>,
}

// ============================================================================
// ICsp Commands
// ============================================================================

#[derive(Subcommand)]
pub enum IcspCommand {
    /// Deploy an OS build plan to a server
    Deploy {
        /// Serial number of the target server
        #[arg(long)]
        server_id: String,

        /// OS build plan name
        #[arg(long)]
        os_build_plan: String,

        /// Network personalization as JSON
        #[arg(long)]
        personality: Option<String>,

        /// Custom attributes as JSON
        #[arg(long)]
        custom_attributes: Option<String>,
    },

    /// Register, remove or personalize a server by iLO address
    Server {
        /// present, absent or network_configured
        #[arg(short, long, default_value = "present")]
        state: String,

        /// Server document: a JSON/TOML file, `-` for stdin, or inline JSON
        #[arg(short, long)]
        data: String,
    },
}
