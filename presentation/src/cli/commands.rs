//! CLI command definitions

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text
    Text,
    /// Pretty-printed JSON
    Json,
}

impl From<OutputFormat> for council_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => council_domain::OutputFormat::Text,
            OutputFormat::Json => council_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for grants-council
#[derive(Parser, Debug)]
#[command(name = "grants-council")]
#[command(author, version, about = "Grants Council - A panel of reviewer personas evaluates grant proposals")]
#[command(long_about = r#"
Grants Council runs every submitted proposal through a panel of reviewer
personas and routes the result for automatic execution or human review.

The pipeline has four stages:
1. Parse & Contextualize: structured extraction and team matching
2. Evaluation: every persona scores the proposal independently
3. Deliberation: personas review anonymized peer evaluations
4. Vote & Decide: votes are aggregated and the decision is routed

Configuration files are loaded from (in priority order):
1. COUNCIL_* environment variables
2. --config <path>       Explicit config file
3. ./council.toml        Project-level config
4. ~/.config/grants-council/config.toml   Global config

Example:
  grants-council submit application.json
  cat application.txt | grants-council submit --stream
  grants-council decide 3f2a... --reject --notes "Milestones are too vague"
  grants-council learn
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format (overrides [output] format)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a proposal through the council
    Submit {
        /// Application file (free text or JSON); reads stdin when omitted
        file: Option<PathBuf>,

        /// Print each pipeline event as one JSON line
        #[arg(long)]
        stream: bool,
    },

    /// Show everything stored about a proposal
    Show {
        proposal: String,
    },

    /// Record a human decision
    Decide(DecideArgs),

    /// Record the real-world outcome of a resolved proposal
    Outcome(OutcomeArgs),

    /// Resolve an ambiguous team match
    #[command(name = "confirm-team")]
    ConfirmTeam(ConfirmTeamArgs),

    /// List known team profiles
    Teams,

    /// List observations
    Observations {
        /// Only observations of this persona
        #[arg(long)]
        persona: Option<String>,

        /// Only observations with this status (draft, reviewed, active, deprecated)
        #[arg(long)]
        status: Option<String>,
    },

    /// Approve an observation so it reaches evaluation prompts
    #[command(name = "approve-observation")]
    ApproveObservation {
        id: String,
    },

    /// Deprecate an observation
    #[command(name = "deprecate-observation")]
    DeprecateObservation {
        id: String,
    },

    /// Process every pending learning event
    Learn {
        /// Process only this event
        #[arg(long, value_name = "EVENT_ID")]
        event: Option<String>,
    },

    /// List the configured reviewer personas
    Personas,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("verdict").required(true).args(["approve", "reject"])))]
pub struct DecideArgs {
    pub proposal: String,

    #[arg(long)]
    pub approve: bool,

    #[arg(long)]
    pub reject: bool,

    /// Rationale recorded with the decision
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args, Debug)]
pub struct OutcomeArgs {
    pub proposal: String,

    /// success, failure or partial
    #[arg(long)]
    pub result: String,

    /// Share of the promised scope delivered (0-100)
    #[arg(long, value_name = "PERCENT")]
    pub completion: Option<f64>,

    /// Delivery quality (1-10)
    #[arg(long)]
    pub quality: Option<f64>,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["team", "new"])))]
pub struct ConfirmTeamArgs {
    pub proposal: String,

    /// Existing team profile id
    pub team: Option<String>,

    /// Create a new profile instead of linking an existing one
    #[arg(long)]
    pub new: bool,
}
