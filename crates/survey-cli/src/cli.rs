//! CLI argument definitions for `survey-admin`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use survey_model::{DatasetId, QuestionSetId, Strand};
use survey_state::DistributionMode;

#[derive(Parser)]
#[command(
    name = "survey-admin",
    version,
    about = "Survey admin - Import question sets and datasets, activate datasets, review results",
    long_about = "Administer the strand recommendation survey.\n\n\
                  Validates .xlsx, .xls and .csv uploads locally before anything is sent,\n\
                  reconciles dataset uploads against their question set, and manages\n\
                  datasets and assessment results on the server."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow respondent answers to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Settings file (default: platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides the settings file).
    #[arg(long = "api-url", env = "SURVEY_ADMIN_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token to use instead of the stored session.
    #[arg(long = "token", env = "SURVEY_ADMIN_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a question-set sheet without contacting the server.
    CheckQuestions(CheckQuestionsArgs),

    /// Validate and reconcile a dataset sheet.
    CheckDataset(CheckDatasetArgs),

    /// Sign in and store the session token.
    Login(LoginArgs),

    /// Forget the stored session.
    Logout,

    /// List question sets.
    QuestionSets,

    /// List the questions of a question set.
    Questions {
        #[arg(value_name = "QUESTION_SET_ID", value_parser = parse_set_id)]
        set: QuestionSetId,
    },

    /// List datasets, optionally only those of one question set.
    Datasets {
        #[arg(long = "question-set", value_parser = parse_set_id)]
        question_set: Option<QuestionSetId>,
    },

    /// Show the strand distribution of a question set or dataset.
    Distribution(DistributionArgs),

    /// Import a question set from a sheet.
    ImportQuestions(ImportQuestionsArgs),

    /// Import a dataset from a sheet.
    ImportDataset(ImportDatasetArgs),

    /// Make a dataset the active one.
    Activate {
        #[arg(value_name = "DATASET_ID", value_parser = parse_dataset_id)]
        dataset: DatasetId,
    },

    /// List assessment results.
    Results(ResultsArgs),

    /// Rename a question set or change its description.
    UpdateQuestionSet(UpdateQuestionSetArgs),

    /// Delete a question set and its datasets.
    DeleteQuestionSet {
        #[arg(value_name = "QUESTION_SET_ID", value_parser = parse_set_id)]
        set: QuestionSetId,
    },

    /// Rename a dataset or change its description.
    UpdateDataset(UpdateDatasetArgs),

    /// Delete a dataset.
    DeleteDataset {
        #[arg(value_name = "DATASET_ID", value_parser = parse_dataset_id)]
        dataset: DatasetId,
    },
}

#[derive(Args)]
pub struct ReportArgs {
    /// Print the ingestion report as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,

    /// Number of accepted rows to preview (default from settings).
    #[arg(long = "preview", value_name = "N")]
    pub preview: Option<usize>,
}

#[derive(Args)]
pub struct CheckQuestionsArgs {
    /// Question sheet (.xlsx, .xls or .csv).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Args)]
pub struct CheckDatasetArgs {
    /// Dataset sheet (.xlsx, .xls or .csv).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Reconcile against a question set on the server.
    #[arg(
        long = "question-set",
        value_parser = parse_set_id,
        required_unless_present = "questions_file",
        conflicts_with = "questions_file"
    )]
    pub question_set: Option<QuestionSetId>,

    /// Reconcile against a local question sheet instead.
    #[arg(long = "questions-file", value_name = "FILE")]
    pub questions_file: Option<PathBuf>,

    #[command(flatten)]
    pub matching: MatchingArgs,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Args)]
pub struct MatchingArgs {
    /// Treat `&` as `and` and collapse inner whitespace when matching questions.
    #[arg(long = "lenient", conflicts_with = "strict")]
    pub lenient: bool,

    /// Match questions after trimming and case folding only.
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long = "email", env = "SURVEY_ADMIN_EMAIL")]
    pub email: String,

    #[arg(long = "password", env = "SURVEY_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args)]
pub struct DistributionArgs {
    #[arg(long = "question-set", value_parser = parse_set_id)]
    pub question_set: QuestionSetId,

    /// Dataset of the question set; without it questions are counted.
    #[arg(long = "dataset", value_parser = parse_dataset_id)]
    pub dataset: Option<DatasetId>,

    /// Count records per strand or sum their scores.
    #[arg(long = "mode", value_enum, default_value = "count")]
    pub mode: DistributionArg,
}

#[derive(Args)]
pub struct ImportQuestionsArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[arg(long = "name")]
    pub name: String,

    #[arg(long = "description", default_value = "")]
    pub description: String,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Args)]
pub struct ImportDatasetArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[arg(long = "name")]
    pub name: String,

    #[arg(long = "description")]
    pub description: String,

    #[arg(long = "question-set", value_parser = parse_set_id)]
    pub question_set: QuestionSetId,

    #[command(flatten)]
    pub matching: MatchingArgs,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Args)]
pub struct ResultsArgs {
    /// Case-insensitive search over id, name, email, strand and dataset.
    #[arg(long = "search", default_value = "")]
    pub search: String,

    #[arg(long = "strand", value_parser = parse_strand)]
    pub strand: Option<Strand>,

    /// Dataset name to restrict results to.
    #[arg(long = "dataset")]
    pub dataset: Option<String>,

    /// Column to sort by; repeat to toggle direction.
    #[arg(long = "sort", value_name = "KEY")]
    pub sort: Vec<String>,

    #[arg(long = "page", default_value_t = 1)]
    pub page: usize,

    /// Rows per page (default from settings).
    #[arg(long = "page-size")]
    pub page_size: Option<usize>,
}

#[derive(Args)]
pub struct UpdateQuestionSetArgs {
    #[arg(value_name = "QUESTION_SET_ID", value_parser = parse_set_id)]
    pub set: QuestionSetId,

    #[arg(long = "name")]
    pub name: String,

    #[arg(long = "description", default_value = "")]
    pub description: String,
}

#[derive(Args)]
pub struct UpdateDatasetArgs {
    #[arg(value_name = "DATASET_ID", value_parser = parse_dataset_id)]
    pub dataset: DatasetId,

    #[arg(long = "name")]
    pub name: String,

    #[arg(long = "description", default_value = "")]
    pub description: String,
}

/// CLI distribution modes.
#[derive(Clone, Copy, ValueEnum)]
pub enum DistributionArg {
    Count,
    Score,
}

impl From<DistributionArg> for DistributionMode {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Count => Self::Count,
            DistributionArg::Score => Self::Score,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_set_id(raw: &str) -> Result<QuestionSetId, String> {
    raw.parse::<i64>()
        .map(QuestionSetId)
        .map_err(|_| format!("invalid question set id: {raw}"))
}

fn parse_dataset_id(raw: &str) -> Result<DatasetId, String> {
    raw.parse::<i64>()
        .map(DatasetId)
        .map_err(|_| format!("invalid dataset id: {raw}"))
}

fn parse_strand(raw: &str) -> Result<Strand, String> {
    Strand::parse(raw).ok_or_else(|| format!("unknown strand: {raw} (expected STEM, ABM or HUMSS)"))
}
