use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod cache;
mod config;
mod enrichment;
mod error;
mod fetcher;
mod format;
mod graphql;
mod lenient;
mod models;
mod objects;
mod pipeline;
mod projects;
mod queries;
mod report;
mod skills;
mod summary;
mod table;
mod xp;

use config::Settings;
use graphql::HttpTransport;
use models::{DataMode, ProjectStatus};
use pipeline::{Dashboard, LoadPlan, Loader};
use table::{Bounds, Filters, TableRow, TableState, PAGE_SIZE};

#[derive(Parser)]
#[command(name = "xp-dashboard")]
#[command(about = "Learner XP and progress dashboard for the Reboot01 platform", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print a bearer token
    Login,
    /// Profile, XP totals, skills and audit ratio
    Summary,
    /// XP transactions table
    Transactions {
        /// Match against the project name
        #[arg(long)]
        search: Option<String>,
        /// Smallest amount to include, in kB (1 kB = 1000 XP)
        #[arg(long)]
        min_kb: Option<f64>,
        /// Largest amount to include, in kB
        #[arg(long)]
        max_kb: Option<f64>,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[command(flatten)]
        view: TableView,
    },
    /// Projects merged from results and progress
    Projects {
        /// Match against name and type
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[command(flatten)]
        view: TableView,
    },
    /// Recent projects and audits
    Activity,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct TableView {
    /// Pages of rows to show, as if "load more" was pressed
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Show only this page (1-based)
    #[arg(long, conflicts_with = "pages", value_parser = clap::value_parser!(u64).range(1..))]
    page: Option<u64>,

    /// Also write every matching row to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Exam,
    Project,
    Exercise,
}

impl KindArg {
    fn as_str(self) -> &'static str {
        match self {
            KindArg::Exam => "exam",
            KindArg::Project => "project",
            KindArg::Exercise => "exercise",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pass,
    Fail,
    InProgress,
    Unknown,
}

impl From<StatusArg> for ProjectStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pass => ProjectStatus::Pass,
            StatusArg::Fail => ProjectStatus::Fail,
            StatusArg::InProgress => ProjectStatus::InProgress,
            StatusArg::Unknown => ProjectStatus::Unknown,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("xp_dashboard={},warn", cli.settings.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "command failed");
            eprintln!("{}", notification(&err));
            ExitCode::FAILURE
        }
    }
}

/// One-line message for a terminal failure.
fn notification(err: &anyhow::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        "Failed to load data".to_string()
    } else {
        message
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings;
    settings.validate().map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Login => {
            let (identifier, password) = settings
                .credentials()
                .context("Pass --identifier and --password (or DASHBOARD_IDENTIFIER / DASHBOARD_PASSWORD)")?;
            let token = auth::signin(
                &settings.signin_url,
                identifier,
                password,
                settings.request_timeout(),
            )
            .await?;
            println!("{token}");
        }
        Commands::Summary => {
            let dashboard = load(&settings, LoadPlan::new(DataMode::Full, true)).await?;
            let summary = summary::summarize(&dashboard.payload, &dashboard.objects, Utc::now());
            print!("{}", report::render_summary(&summary));
        }
        Commands::Transactions {
            search,
            min_kb,
            max_kb,
            from,
            to,
            view,
        } => {
            let dashboard = load(&settings, LoadPlan::new(DataMode::Transactions, false)).await?;
            let rows = table::transaction_rows(&dashboard.payload);
            let filters = Filters {
                text: search,
                amount: kb_bounds(min_kb, max_kb),
                time: Bounds {
                    min: from.map(|day| day.and_time(NaiveTime::MIN).and_utc()),
                    max: to
                        .and_then(|day| day.succ_opt())
                        .map(|next| next.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::milliseconds(1)),
                },
                ..Default::default()
            };
            print_table(&rows, &filters, &view, "No transactions found")?;
        }
        Commands::Projects {
            search,
            kind,
            status,
            view,
        } => {
            let dashboard = load(&settings, LoadPlan::new(DataMode::Projects, true)).await?;
            let rows = projects::reconcile(
                &dashboard.payload.results,
                &dashboard.payload.progress,
                &dashboard.objects,
            );
            let filters = Filters {
                text: search,
                kind: kind.map(|kind| kind.as_str().to_string()),
                status: status.map(ProjectStatus::from),
                ..Default::default()
            };
            print_table(&rows, &filters, &view, "No projects found")?;
        }
        Commands::Activity => {
            let dashboard = load(&settings, LoadPlan::new(DataMode::Full, false)).await?;
            print!("{}", report::render_activity(&summary::activity(&dashboard.payload)));
        }
        Commands::Report { out } => {
            let dashboard = load(&settings, LoadPlan::new(DataMode::Full, true)).await?;
            let now = Utc::now();
            let summary = summary::summarize(&dashboard.payload, &dashboard.objects, now);
            let activity = summary::activity(&dashboard.payload);
            let rows = projects::reconcile(
                &dashboard.payload.results,
                &dashboard.payload.progress,
                &dashboard.objects,
            );
            let report = report::build_report(&summary, &activity, &rows, now);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}", out.display());
        }
    }

    Ok(())
}

async fn resolve_token(settings: &Settings) -> anyhow::Result<String> {
    if let Some(token) = settings.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }
    let (identifier, password) = settings
        .credentials()
        .context("Not signed in. Pass --token, or --identifier and --password")?;
    Ok(auth::signin(&settings.signin_url, identifier, password, settings.request_timeout()).await?)
}

async fn load(settings: &Settings, plan: LoadPlan) -> anyhow::Result<Dashboard> {
    let token = resolve_token(settings).await?;
    let transport = HttpTransport::new(&settings.graphql_url, settings.request_timeout())
        .context("failed to build HTTP client")?;
    let cache = settings.open_cache();
    let loader = Loader::new(&transport, &cache, &token);

    if loader.is_first_load(plan.mode) {
        eprintln!("Loading your dashboard...");
    }
    let dashboard = loader.load(plan).await?;
    debug!(from_cache = dashboard.from_cache, "dashboard ready");
    Ok(dashboard)
}

/// Amount bounds in XP from bounds given in kB.
fn kb_bounds(min_kb: Option<f64>, max_kb: Option<f64>) -> Bounds<f64> {
    Bounds {
        min: min_kb.map(|kb| kb * 1000.0),
        max: max_kb.map(|kb| kb * 1000.0),
    }
}

fn print_table<R: TableRow>(
    rows: &[R],
    filters: &Filters,
    view: &TableView,
    empty_message: &str,
) -> anyhow::Result<()> {
    let mut state = TableState::new(rows, PAGE_SIZE);
    state.set_filters(filters);

    match view.page {
        Some(number) => {
            let matching = state.matching();
            let index = usize::try_from(number - 1).unwrap_or(usize::MAX);
            let shown = table::page(matching, PAGE_SIZE, index);
            print!("{}", table::render_text(shown, empty_message));
            println!("Page {number}, {} matching rows", matching.len());
        }
        None => {
            let pages = view.pages.max(1);
            state.load_more(pages - 1);
            print!("{}", table::render_text(state.visible(), empty_message));
            println!("{}", state.count_label());
            if state.has_more() {
                println!("Use --pages {} to load more", pages.saturating_add(1));
            }
        }
    }

    if let Some(path) = &view.csv {
        let matching = state.matching();
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        table::write_csv(file, matching)?;
        eprintln!("Wrote {} rows to {}", matching.len(), path.display());
    }
    Ok(())
}
