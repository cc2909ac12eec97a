//! Survey admin CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use survey_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{Context, Status};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("error: failed to start runtime: {error}");
            std::process::exit(1);
        }
    };

    let ctx = Context::load(cli.config, cli.api_url, cli.token);
    let exit_code = match runtime.block_on(run(cli.command, &ctx)) {
        Ok(status) => status.exit_code(),
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "command failed");
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(command: Command, ctx: &Context) -> anyhow::Result<Status> {
    match command {
        Command::CheckQuestions(args) => commands::run_check_questions(&args, ctx),
        Command::CheckDataset(args) => commands::run_check_dataset(&args, ctx).await,
        Command::Login(args) => commands::run_login(&args, ctx).await,
        Command::Logout => commands::run_logout(ctx),
        Command::QuestionSets => commands::run_question_sets(ctx).await,
        Command::Questions { set } => commands::run_questions(set, ctx).await,
        Command::Datasets { question_set } => commands::run_datasets(question_set, ctx).await,
        Command::Distribution(args) => commands::run_distribution(&args, ctx).await,
        Command::ImportQuestions(args) => commands::run_import_questions(&args, ctx).await,
        Command::ImportDataset(args) => commands::run_import_dataset(&args, ctx).await,
        Command::Activate { dataset } => commands::run_activate(dataset, ctx).await,
        Command::Results(args) => commands::run_results(&args, ctx).await,
        Command::UpdateQuestionSet(args) => commands::run_update_question_set(&args, ctx).await,
        Command::DeleteQuestionSet { set } => commands::run_delete_question_set(set, ctx).await,
        Command::UpdateDataset(args) => commands::run_update_dataset(&args, ctx).await,
        Command::DeleteDataset { dataset } => commands::run_delete_dataset(dataset, ctx).await,
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        log_data: cli.log_data,
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
