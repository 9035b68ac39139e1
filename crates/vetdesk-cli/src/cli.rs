use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "vetdesk")]
#[command(version, about = "Vetdesk - clinic and store management from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base endpoint (defaults to the configured one)
    #[arg(long, global = true, env = "VETDESK_API_URL")]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session tokens
    Login {
        /// Account email (defaults to the last one used)
        #[arg(long, env = "VETDESK_EMAIL")]
        email: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in account and its roles
    Whoami,

    /// Rotate the access token now
    Refresh,

    /// GET any API path and print the JSON response
    Get {
        /// Path under the base endpoint, e.g. /tutors/
        path: String,

        /// Query parameters as key=value
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },

    /// List products
    Products {
        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        #[arg(long)]
        branch: Option<String>,
    },

    /// List tutors (customers)
    Tutors {
        #[arg(long)]
        search: Option<String>,
    },

    /// List pending delivery orders
    Deliveries {
        /// Only orders nobody has been assigned to
        #[arg(long)]
        unassigned: bool,
    },

    /// Sales totals for a period
    Stats {
        /// Start date, YYYY-MM-DD
        #[arg(long)]
        start: String,

        /// End date, YYYY-MM-DD
        #[arg(long)]
        end: String,
    },

    /// Upload a CSV file to an import endpoint
    Import(ImportArgs),

    /// Write a header-only CSV template
    Template {
        /// Import title, used for the file name
        title: String,

        /// Column names
        #[arg(required = true)]
        fields: Vec<String>,

        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// List a patient's exams
    Exams { patient_id: String },

    /// Save an exam and upload files to it
    AttachExam(AttachExamArgs),

    /// Download a stored file
    Download {
        file_id: String,

        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Args)]
pub struct ImportArgs {
    /// Import endpoint, e.g. /import/tutors
    pub endpoint: String,

    /// CSV file to upload
    pub file: PathBuf,

    /// Replace existing records instead of adding to them
    #[arg(long)]
    pub delete_existing: bool,
}

#[derive(Args)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["patient", "exam"])))]
pub struct AttachExamArgs {
    /// Create a new exam for this patient
    #[arg(long)]
    pub patient: Option<String>,

    /// Update this existing exam
    #[arg(long)]
    pub exam: Option<String>,

    /// Exam type, e.g. hemograma
    #[arg(long = "type")]
    pub kind: String,

    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub result: Option<String>,

    /// Comment attached to every uploaded file
    #[arg(long)]
    pub comment: Option<String>,

    /// Files to upload, in order
    pub files: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Product,
    Service,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}
