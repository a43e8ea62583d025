#![forbid(unsafe_code)]

//! `bugdesk`: terminal front end for the bug-report desk.
//!
//! Resolves the launch parameter, runs the session startup sequence and
//! executes one subcommand against the report server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use bugdesk_client::api::http::HttpReportApi;
use bugdesk_client::api::ReportApi;
use bugdesk_client::collection::{CollectionState, LoadOutcome};
use bugdesk_client::config::load_init_data;
use bugdesk_client::host::Host;
use bugdesk_client::models::form::ReportForm;
use bugdesk_client::models::report::ReportStatus;
use bugdesk_client::models::upload::UploadFileEntry;
use bugdesk_client::session::detail::{AdminReportDetail, UserReportDetail};
use bugdesk_client::session::router::{Page, PageView};
use bugdesk_client::session::{OpenedReport, Session};
use bugdesk_client::upload::estimator::format_file_size;
use bugdesk_client::upload::{UploadEvent, UploadOutcome};
use bugdesk_client::{AppError, ClientConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "bugdesk", about = "Bug report desk client", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Launch parameter, e.g. `-100123_456` or `admin_-100123_456`.
    #[arg(long)]
    start_param: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run startup and show the landing page.
    Start,
    /// List your own reports.
    Mine {
        /// Number of pages to fetch.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// List the chat's triage queue.
    Queue {
        /// Only show reports in this status.
        #[arg(long, value_parser = parse_status)]
        status: Option<ReportStatus>,
        /// Full-text search instead of paging.
        #[arg(long)]
        search: Option<String>,
    },
    /// File a new report.
    Submit(SubmitArgs),
    /// Edit one of your reports.
    Edit {
        /// Report id.
        id: i64,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Change a report's triage status.
    Triage {
        /// Report id.
        id: i64,
        /// New status.
        #[arg(long, value_parser = parse_status)]
        status: ReportStatus,
        /// External tracker id.
        #[arg(long)]
        tracking_id: Option<String>,
        /// Comment for the reporter (kept for `revision` only).
        #[arg(long)]
        comment: Option<String>,
    },
    /// Export the chat's reports as CSV.
    Export,
}

#[derive(Debug, Args)]
struct SubmitArgs {
    #[arg(long)]
    login: String,
    #[arg(long)]
    platform: String,
    #[arg(long)]
    version: String,
    #[arg(long)]
    server: String,
    #[arg(long)]
    description: String,
    #[arg(long, default_value = "")]
    subscriber: String,
    /// When the bug occurred (`YYYY-MM-DDTHH:MM`); defaults to now.
    #[arg(long)]
    error_time: Option<String>,
    /// Attachment; repeat for several.
    #[arg(long = "file")]
    files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct EditArgs {
    #[arg(long)]
    login: Option<String>,
    #[arg(long)]
    platform: Option<String>,
    #[arg(long)]
    version: Option<String>,
    #[arg(long)]
    error_time: Option<String>,
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    subscriber: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

fn parse_status(raw: &str) -> std::result::Result<ReportStatus, String> {
    ReportStatus::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ReportStatus::ALL.into_iter().map(ReportStatus::as_str).collect();
        format!("unknown status {raw}, expected one of {}", known.join(", "))
    })
}

/// Host backed by the terminal: alerts go to stdout, closing cancels the run.
struct TerminalHost {
    launch_param: Option<String>,
    token: String,
    closed: CancellationToken,
}

impl Host for TerminalHost {
    fn launch_param(&self) -> Option<String> {
        self.launch_param.clone()
    }

    fn auth_token(&self) -> String {
        self.token.clone()
    }

    fn show_alert(&self, message: &str) {
        println!("{message}");
    }

    fn close(&self) {
        info!("host close requested");
        self.closed.cancel();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("bugdesk client bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = ClientConfig::load_from_path(&args.config)?;
    let token = load_init_data().await?;
    info!("configuration loaded");

    // ── Build session ───────────────────────────────────
    let closed = CancellationToken::new();
    let host = Arc::new(TerminalHost {
        launch_param: args.start_param,
        token,
        closed: closed.clone(),
    });
    let api: Arc<dyn ReportApi> = Arc::new(HttpReportApi::new(&config, host.auth_token())?);
    let mut session = Session::new(config, api, host);

    let view = session.start().await;
    info!(page = view.active.as_str(), "session started");

    match args.command {
        Command::Start => print_start(&session, &view).await,
        Command::Mine { pages } => {
            session.switch_page(Page::MyReports).await;
            for _ in 1..pages {
                if !session.my_reports().snapshot().await.has_more {
                    break;
                }
                ensure_loaded(session.load_more_mine().await)?;
            }
            print_listing(&session.my_reports().snapshot().await);
        }
        Command::Queue { status, search } => run_queue(&mut session, status, search).await?,
        Command::Submit(submit) => run_submit(&mut session, submit, &closed).await?,
        Command::Edit { id, fields } => run_edit(&mut session, id, fields).await?,
        Command::Triage {
            id,
            status,
            tracking_id,
            comment,
        } => {
            session.switch_page(Page::Admin).await;
            let detail = session.open_admin_report(id).await?;
            let mut edit = detail.edit_form();
            edit.status = status;
            if let Some(tracking_id) = tracking_id {
                edit.tracking_id = tracking_id;
            }
            if let Some(comment) = comment {
                edit.status_comment = comment;
            }
            session.save_admin_report(id, edit).await?;
        }
        Command::Export => {
            let path = session.export_csv().await?;
            println!("exported to {}", path.display());
        }
    }

    info!("bugdesk client finished");
    Ok(())
}

async fn print_start(session: &Session, view: &PageView) {
    println!("page: {}", view.active.as_str());
    if view.admin_entry_visible {
        println!("admin rights: yes");
    }
    match session.opened() {
        Some(OpenedReport::User(detail)) => print_user_detail(detail),
        Some(OpenedReport::Admin(detail)) => print_admin_detail(detail),
        None => {}
    }
    match view.active {
        Page::MyReports => print_listing(&session.my_reports().snapshot().await),
        Page::Admin => print_listing(&session.admin_queue().snapshot().await),
        Page::Form => {}
    }
}

async fn run_queue(
    session: &mut Session,
    status: Option<ReportStatus>,
    search: Option<String>,
) -> Result<()> {
    let view = session.switch_page(Page::Admin).await;
    if view.active != Page::Admin {
        return Err(AppError::Unauthorized("admin rights required".into()));
    }
    if status.is_some() {
        ensure_loaded(session.filter_admin(status).await)?;
    }
    if let Some(query) = search {
        ensure_loaded(session.search_admin(&query).await)?;
    }
    let state = session.admin_queue().snapshot().await;
    if let Some(stats) = state.stats {
        println!(
            "total {} | new {} | in progress {} | completed {}",
            stats.total, stats.new, stats.in_progress, stats.completed
        );
    }
    print_listing(&state);
    Ok(())
}

async fn run_edit(session: &mut Session, id: i64, fields: EditArgs) -> Result<()> {
    let detail = session.open_user_report(id).await?;
    print_user_detail(&detail);
    if let Some(message) = detail.lock_message {
        return Err(AppError::Validation(message.into()));
    }
    let mut edit = detail.edit_form();
    let merge = |slot: &mut String, value: Option<String>| {
        if let Some(value) = value {
            *slot = value;
        }
    };
    merge(&mut edit.user_login, fields.login);
    merge(&mut edit.platform, fields.platform);
    merge(&mut edit.platform_version, fields.version);
    merge(&mut edit.error_time, fields.error_time);
    merge(&mut edit.server, fields.server);
    merge(&mut edit.subscriber_info, fields.subscriber);
    merge(&mut edit.description, fields.description);
    session.save_user_report(id, edit).await
}

async fn run_submit(
    session: &mut Session,
    args: SubmitArgs,
    closed: &CancellationToken,
) -> Result<()> {
    let mut form = ReportForm::with_current_time();
    form.login = args.login;
    form.platform = args.platform;
    form.version = args.version;
    form.server = args.server;
    form.description = args.description;
    form.subscriber = args.subscriber;
    if let Some(error_time) = args.error_time {
        form.error_time = error_time;
    }

    let mut batch = Vec::with_capacity(args.files.len());
    for path in &args.files {
        batch.push(UploadFileEntry::from_path(path).await?);
    }
    let report = session.upload_mut().add_files(batch);
    if let Some(message) = report.message() {
        println!("{message}");
    }
    for entry in session.upload().files().entries() {
        println!("  {} ({})", entry.name, format_file_size(entry.size_bytes));
    }
    if let Some(counter) = session.upload().files().counter_text() {
        println!("{counter}");
    }

    let (tx, mut rx) = mpsc::channel(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                UploadEvent::Progress(progress) => println!(
                    "{} {} {}",
                    progress.stage.heading(),
                    progress.indicator(),
                    progress.hint()
                ),
                UploadEvent::Settled(_) => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let signal_watch = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let result = session.submit_report(&form, &tx, &cancel).await;
    drop(tx);
    signal_watch.abort();
    if let Err(err) = printer.await {
        error!(%err, "progress printer failed");
    }

    match result? {
        UploadOutcome::Done { report_number } => {
            match report_number {
                Some(number) => println!("report #{number} sent"),
                None => println!("report sent"),
            }
            if let Some(close) = session.take_close_task() {
                let _ = close.await;
            }
            closed.cancelled().await;
            Ok(())
        }
        UploadOutcome::Failed(failure) => Err(AppError::Server(failure.to_string())),
    }
}

fn ensure_loaded(outcome: LoadOutcome) -> Result<()> {
    match outcome {
        LoadOutcome::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

fn print_listing(state: &CollectionState) {
    if let Some(error) = &state.error {
        println!("error: {error}");
        return;
    }
    if state.items.is_empty() {
        println!("no reports");
        return;
    }
    for report in &state.items {
        println!(
            "#{:<5} {:<15} {:<20} {}",
            report.report_number,
            report.status.label(),
            report.platform_line(),
            report.created_display()
        );
    }
    if state.has_more {
        println!("more reports available");
    }
}

fn print_user_detail(detail: &UserReportDetail) {
    println!("{} [{}]", detail.title, detail.status_label);
    if let Some(comment) = &detail.revision_comment {
        println!("revision requested: {comment}");
    }
    println!("tracking: {}", detail.tracking);
    println!("created: {}", detail.created);
    println!("{}", detail.report.description);
    if let Some(message) = detail.lock_message {
        println!("{message}");
    }
}

fn print_admin_detail(detail: &AdminReportDetail) {
    println!("{} from {}", detail.title, detail.reporter);
    println!("status: {}", detail.report.status.label());
    for (label, value) in &detail.fields {
        println!("{label}: {value}");
    }
    println!("created: {}", detail.created);
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
