use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use tracing::{info, info_span, instrument, trace};

use survey_ingest::{
    FileKind, IngestionOutcome, ReferenceQuestions, Rejection, ingest_dataset,
    ingest_question_set,
};
use survey_state::session::{self, SharedSession};
use survey_state::{
    Activation, Backend, Credentials, Dashboard, DatasetForm, DistributionMode, HttpBackend,
    QuestionSetForm, ResultFilter, Session, TableView, Upload,
};

use survey_cli::logging::redact_value;
use survey_cli::settings::{self, Settings};
use survey_cli::summary::{
    datasets_table, distribution_table, page_footer, print_outcome, question_sets_table,
    questions_table, results_table,
};

use crate::cli::{
    CheckDatasetArgs, CheckQuestionsArgs, DistributionArgs, ImportDatasetArgs,
    ImportQuestionsArgs, LoginArgs, ReportArgs, ResultsArgs, UpdateDatasetArgs,
    UpdateQuestionSetArgs,
};

/// How a command ended, for the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Rejected,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Rejected => 1,
        }
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Settings and connection details shared by every command.
pub struct Context {
    pub settings: Settings,
    pub session_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub token: Option<String>,
}

impl Context {
    /// Loads settings from `config` or the platform default.
    pub fn load(config: Option<PathBuf>, api_url: Option<String>, token: Option<String>) -> Self {
        let settings_path = config.or_else(Settings::default_path);
        let settings = settings_path
            .as_deref()
            .map(Settings::load_from)
            .unwrap_or_default();
        Self {
            settings,
            session_path: settings_path.as_deref().map(settings::session_path),
            api_url,
            token,
        }
    }

    /// The session to send requests with: an explicit token, else the stored
    /// one.
    fn session(&self) -> SharedSession {
        let ttl = self.settings.session_ttl();
        let session = if let Some(token) = &self.token {
            let mut session = Session::new(ttl);
            session.begin(token.clone());
            session
        } else if let Some(stored) = self.session_path.as_deref().and_then(settings::load_session)
        {
            Session::resume(stored, ttl)
        } else {
            Session::new(ttl)
        };
        session::shared(session)
    }

    fn backend(&self, session: SharedSession) -> Result<Arc<HttpBackend>> {
        let config = self.settings.api_config(self.api_url.as_deref());
        let backend = HttpBackend::new(&config, session)
            .with_context(|| format!("connect to {}", config.base_url))?;
        Ok(Arc::new(backend))
    }

    /// Drops the session file once the stored token has expired.
    fn forget_expired(&self, session: &SharedSession) -> Result<()> {
        if self.token.is_some() {
            return Ok(());
        }
        if let Some(path) = &self.session_path
            && session::lock(session).stored_token().is_none()
        {
            settings::clear_session(path)?;
        }
        Ok(())
    }

    /// Runs `command` against a dashboard over the HTTP backend.
    pub async fn with_dashboard<T, F>(&self, command: F) -> Result<T>
    where
        F: AsyncFnOnce(&Dashboard<HttpBackend>) -> Result<T>,
    {
        let session = self.session();
        let dashboard = Dashboard::new(self.backend(session.clone())?);
        let result = command(&dashboard).await;
        self.forget_expired(&session)?;
        result
    }
}

// =============================================================================
// LOCAL CHECKS
// =============================================================================

fn ingest_file(
    path: &Path,
    ingest: impl FnOnce(&[u8], FileKind) -> IngestionOutcome,
) -> Result<IngestionOutcome> {
    let kind = match FileKind::from_path(path) {
        Ok(kind) => kind,
        Err(error) => return Ok(Rejection::from(error).into()),
    };
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(ingest(&bytes, kind))
}

fn read_upload(path: &Path) -> Result<Upload> {
    Upload::read(path).with_context(|| format!("read {}", path.display()))
}

fn report(outcome: &IngestionOutcome, args: &ReportArgs, settings: &Settings) -> Result<Status> {
    if args.json {
        let json = serde_json::to_string_pretty(&outcome.report()).context("serialize report")?;
        println!("{json}");
    } else {
        print_outcome(
            outcome,
            args.preview.unwrap_or(settings.ingest.preview_rows),
        );
    }
    trace_answers(outcome);
    Ok(if outcome.is_ready() {
        Status::Success
    } else {
        Status::Rejected
    })
}

fn trace_answers(outcome: &IngestionOutcome) {
    let IngestionOutcome::Ready(upload) = outcome else {
        return;
    };
    for row in upload.dataset_rows() {
        for (question, answer) in &row.answers {
            trace!(row = row.row_number, %question, answer = redact_value(answer), "answer");
        }
    }
}

pub fn run_check_questions(args: &CheckQuestionsArgs, ctx: &Context) -> Result<Status> {
    let _span = info_span!("check_questions", file = %args.file.display()).entered();
    let outcome = ingest_file(&args.file, ingest_question_set)?;
    report(&outcome, &args.report, &ctx.settings)
}

/// Reference questions from a local question sheet.
fn local_reference(path: &Path) -> Result<ReferenceQuestions> {
    match ingest_file(path, ingest_question_set)? {
        IngestionOutcome::Ready(upload) => {
            let rows: Vec<_> = upload.questions().cloned().collect();
            Ok(ReferenceQuestions::from_rows(&rows))
        }
        IngestionOutcome::Rejected(rejection) => {
            bail!("question sheet {} is not usable: {rejection}", path.display())
        }
    }
}

#[instrument(skip_all, fields(file = %args.file.display()))]
pub async fn run_check_dataset(args: &CheckDatasetArgs, ctx: &Context) -> Result<Status> {
    let policy = ctx
        .settings
        .match_policy(args.matching.lenient, args.matching.strict);
    let reference = match (&args.questions_file, args.question_set) {
        (Some(path), _) => local_reference(path)?,
        (None, Some(set)) => {
            let questions = ctx
                .with_dashboard(async |dashboard| {
                    dashboard.backend().questions(set).await.map_err(server_error)
                })
                .await?;
            ReferenceQuestions::from_questions(&questions)
        }
        (None, None) => bail!("a question set or a questions file is required"),
    };
    info!(questions = reference.len(), ?policy, "reconciling dataset");
    let outcome = ingest_file(&args.file, |bytes, kind| {
        ingest_dataset(bytes, kind, &reference, policy)
    })?;
    report(&outcome, &args.report, &ctx.settings)
}

// =============================================================================
// SESSION
// =============================================================================

pub async fn run_login(args: &LoginArgs, ctx: &Context) -> Result<Status> {
    let shared = session::shared(Session::new(ctx.settings.session_ttl()));
    let backend = ctx.backend(shared.clone())?;
    let credentials = Credentials {
        email: args.email.trim().to_string(),
        password: args.password.clone(),
    };
    let user = session::login(backend.as_ref(), &shared, &credentials)
        .await
        .map_err(server_error)?;

    let token = session::lock(&shared).stored_token().cloned();
    match (&ctx.session_path, token) {
        (Some(path), Some(token)) => settings::save_session(path, &token)?,
        _ => bail!("no location to store the session"),
    }
    println!("Signed in as {}", user.display_name());
    Ok(Status::Success)
}

pub fn run_logout(ctx: &Context) -> Result<Status> {
    if let Some(path) = &ctx.session_path {
        settings::clear_session(path)?;
    }
    println!("Signed out");
    Ok(Status::Success)
}

// =============================================================================
// COLLECTIONS
// =============================================================================

fn server_error(err: survey_state::StateError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}

pub async fn run_question_sets(ctx: &Context) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        dashboard.refresh_question_sets().await.map_err(server_error)?;
        dashboard.with_state(|state| println!("{}", question_sets_table(state.question_sets())));
        Ok(Status::Success)
    })
    .await
}

pub async fn run_questions(set: survey_model::QuestionSetId, ctx: &Context) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        let questions = dashboard.backend().questions(set).await.map_err(server_error)?;
        println!("{}", questions_table(&questions));
        Ok(Status::Success)
    })
    .await
}

pub async fn run_datasets(
    question_set: Option<survey_model::QuestionSetId>,
    ctx: &Context,
) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        dashboard.load().await.map_err(server_error)?;
        if let Some(set) = question_set {
            dashboard.select_set(set).await.map_err(server_error)?;
        }
        dashboard.with_state(|state| {
            let datasets = match question_set {
                Some(_) => state.filtered_datasets(),
                None => state.datasets().iter().collect(),
            };
            println!("{}", datasets_table(&datasets));
        });
        Ok(Status::Success)
    })
    .await
}

pub async fn run_distribution(args: &DistributionArgs, ctx: &Context) -> Result<Status> {
    let mode = DistributionMode::from(args.mode);
    ctx.with_dashboard(async |dashboard| {
        dashboard.load().await.map_err(server_error)?;
        dashboard
            .select_set(args.question_set)
            .await
            .map_err(server_error)?;
        if let Some(dataset) = args.dataset {
            dashboard.select_dataset(dataset).await.map_err(server_error)?;
        }
        match dashboard.with_state(|state| state.distribution(mode)) {
            Some(distribution) => println!("{}", distribution_table(&distribution, mode)),
            None => println!("Nothing to chart: the selection has no questions or records"),
        }
        Ok(Status::Success)
    })
    .await
}

// =============================================================================
// IMPORTS
// =============================================================================

#[instrument(skip_all, fields(name = %args.name))]
pub async fn run_import_questions(args: &ImportQuestionsArgs, ctx: &Context) -> Result<Status> {
    let form = QuestionSetForm {
        name: args.name.clone(),
        description: args.description.clone(),
        file: Some(read_upload(&args.file)?),
    };
    let outcome = ctx
        .with_dashboard(async |dashboard| Ok(dashboard.import_question_set(&form).await))
        .await?;
    report(&outcome, &args.report, &ctx.settings)
}

#[instrument(skip_all, fields(name = %args.name))]
pub async fn run_import_dataset(args: &ImportDatasetArgs, ctx: &Context) -> Result<Status> {
    let policy = ctx
        .settings
        .match_policy(args.matching.lenient, args.matching.strict);
    let form = DatasetForm {
        name: args.name.clone(),
        description: args.description.clone(),
        question_set: Some(args.question_set),
        file: Some(read_upload(&args.file)?),
    };
    let outcome = ctx
        .with_dashboard(async |dashboard| Ok(dashboard.import_dataset(&form, policy).await))
        .await?;
    report(&outcome, &args.report, &ctx.settings)
}

// =============================================================================
// ACTIVATION AND EDITS
// =============================================================================

pub async fn run_activate(dataset: survey_model::DatasetId, ctx: &Context) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        match dashboard.activate(dataset).await.map_err(server_error)? {
            Activation::Activated(datasets) => {
                let rows: Vec<_> = datasets.iter().collect();
                println!("{}", datasets_table(&rows));
                Ok(Status::Success)
            }
            Activation::Unrefreshed(err) => {
                println!(
                    "Dataset {dataset} activated, but the dataset list could not be reloaded: {}",
                    err.user_message()
                );
                Ok(Status::Success)
            }
            Activation::Suppressed => {
                println!("Activation of dataset {dataset} is already in progress");
                Ok(Status::Success)
            }
        }
    })
    .await
}

pub async fn run_update_question_set(args: &UpdateQuestionSetArgs, ctx: &Context) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        dashboard
            .update_question_set(args.set, &args.name, &args.description)
            .await
            .map_err(server_error)?;
        dashboard.with_state(|state| println!("{}", question_sets_table(state.question_sets())));
        Ok(Status::Success)
    })
    .await
}

pub async fn run_delete_question_set(
    set: survey_model::QuestionSetId,
    ctx: &Context,
) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        dashboard.delete_question_set(set).await.map_err(server_error)?;
        println!("Deleted question set {set} and its datasets");
        Ok(Status::Success)
    })
    .await
}

pub async fn run_update_dataset(args: &UpdateDatasetArgs, ctx: &Context) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        dashboard
            .update_dataset(args.dataset, &args.name, &args.description)
            .await
            .map_err(server_error)?;
        dashboard.with_state(|state| {
            let datasets: Vec<_> = state.datasets().iter().collect();
            println!("{}", datasets_table(&datasets));
        });
        Ok(Status::Success)
    })
    .await
}

pub async fn run_delete_dataset(dataset: survey_model::DatasetId, ctx: &Context) -> Result<Status> {
    ctx.with_dashboard(async |dashboard| {
        dashboard.delete_dataset(dataset).await.map_err(server_error)?;
        println!("Deleted dataset {dataset}");
        Ok(Status::Success)
    })
    .await
}

// =============================================================================
// RESULTS
// =============================================================================

pub async fn run_results(args: &ResultsArgs, ctx: &Context) -> Result<Status> {
    let results = ctx
        .with_dashboard(async |dashboard| dashboard.backend().results().await.map_err(server_error))
        .await?;
    let page_size = args.page_size.unwrap_or(ctx.settings.table.page_size);
    let mut view = TableView::new(results, page_size);
    ResultFilter {
        strand: args.strand,
        dataset: args.dataset.clone(),
    }
    .apply(&mut view);
    view.set_query(&args.search);
    for key in &args.sort {
        view.sort_by(key);
    }
    view.set_page(args.page);

    println!("{}", results_table(&view));
    println!(
        "{}",
        page_footer(view.page(), view.page_count(), view.filtered_len())
    );
    Ok(Status::Success)
}
