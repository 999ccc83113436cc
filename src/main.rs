use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use riskmon::config::ENV_API_URL;
use riskmon::{
    report, ApiClient, CauseStage, Config, EvidenceStage, FilterState, Period,
    RankingView, Session, Stage,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Exit code when the ranking could not be loaded
const EXIT_BACKEND_DOWN: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "riskmon")]
#[command(author, version, about = "Product-return risk dashboard backed by the review risk API")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Base URL of the risk backend
    #[arg(long, env = ENV_API_URL, global = true)]
    api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// How long a period's ranking is reused, in seconds
    #[arg(long, global = true)]
    cache_ttl_secs: Option<u64>,

    /// Ranking rows requested per period
    #[arg(long, global = true)]
    snapshot_cap: Option<u32>,
}

#[derive(clap::Args, Debug, Clone)]
struct FilterArgs {
    /// Period to analyze (2023-01 .. 2023-09)
    #[arg(short, long, default_value = "2023-01")]
    periodo: Period,

    /// How many of the riskiest products to show (5-100)
    #[arg(short = 'n', long, default_value_t = 10)]
    top_n: u32,

    /// Minimum review volume per product (0-200, step 5)
    #[arg(short, long, default_value_t = 20)]
    min_reviews: u32,
}

impl FilterArgs {
    fn to_filter(&self) -> FilterState {
        FilterState::new(self.periodo.clone(), self.top_n, self.min_reviews)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the interactive dashboard in the browser
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8501")]
        port: u16,

        /// Don't open the browser
        #[arg(long)]
        no_open: bool,
    },

    /// Print KPIs and the risk ranking
    Ranking {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show causes and evidence for one visible product
    Drill {
        /// ASIN from the visible ranking
        asin: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Write the dashboard to a file (.html, .json, .csv)
    Report {
        /// Output file; format follows the extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for auto-named reports
        #[arg(long, default_value = "riskmon-reports")]
        report_dir: PathBuf,

        /// Product to drill into (defaults to the top row)
        #[arg(long)]
        asin: Option<String>,

        /// Don't open the report afterwards
        #[arg(long)]
        no_open: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    debug!(?config, "configuration resolved");

    let mut client = match ApiClient::connect(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Cannot create backend client: {}", e);
            std::process::exit(1);
        }
    };

    let command = args.command.unwrap_or(Command::Serve { port: 8501, no_open: false });

    match command {
        Command::Serve { port, no_open } => {
            if let Err(e) = riskmon::serve::start(port, client, !no_open) {
                eprintln!("Server error: {}", e);
                std::process::exit(1);
            }
        }

        Command::Ranking { filter } => {
            let session = with_spinner("Loading ranking", || {
                let mut session = Session::new();
                session.set_filter(filter.to_filter());
                session.load_ranking(&mut client);
                session
            });
            print_ranking(&session);
            exit_for(&session);
        }

        Command::Drill { asin, filter } => {
            let mut session = with_spinner("Loading ranking", || {
                let mut session = Session::new();
                session.set_filter(filter.to_filter());
                session.load_ranking(&mut client);
                session
            });

            if session.view().is_none() {
                print_ranking(&session);
                exit_for(&session);
                return;
            }

            let picked = with_spinner("Loading causes", || session.select_asin(&client, &asin));
            if let Err(e) = picked {
                eprintln!("\x1b[31m{}\x1b[0m", e);
                eprintln!("Run 'riskmon ranking' with the same filters to see selectable ASINs.");
                std::process::exit(1);
            }
            print_drilldown(&session);
        }

        Command::Report { output, report_dir, asin, no_open, filter } => {
            let session = with_spinner("Evaluating dashboard", || {
                Session::evaluate(&mut client, filter.to_filter(), asin.as_deref())
            });

            let path = output.unwrap_or_else(|| {
                std::fs::create_dir_all(&report_dir).ok();
                let timestamp = Local::now().format("%Y%m%d_%H%M%S");
                report_dir.join(format!("riskmon_{}_{}.html", filter.periodo, timestamp))
            });

            if let Err(e) = report::generate(&path, &session) {
                eprintln!("Failed to write report: {}", e);
                std::process::exit(1);
            }
            eprintln!("\x1b[32mReport saved: {}\x1b[0m", path.display());

            if !no_open {
                if let Err(e) = open::that(&path) {
                    eprintln!("Failed to open report: {}", e);
                }
            }
            exit_for(&session);
        }
    }
}

fn build_config(args: &Args) -> Result<Config, riskmon::ConfigError> {
    let mut config = Config::from_env()?;
    if let Some(ref url) = args.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.cache_ttl_secs {
        config.cache_ttl = Duration::from_secs(secs);
    }
    if let Some(cap) = args.snapshot_cap {
        config.snapshot_cap = cap;
    }
    Ok(config)
}

fn with_spinner<T>(message: &str, work: impl FnOnce() -> T) -> T {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = work();
    pb.finish_and_clear();
    out
}

fn exit_for(session: &Session) {
    if matches!(session.stage(), Stage::RankingLoadFailed { .. }) {
        std::process::exit(EXIT_BACKEND_DOWN);
    }
}

fn print_ranking(session: &Session) {
    match session.stage() {
        Stage::RankingLoadFailed { api_url, .. } => {
            eprintln!("\x1b[31m{}\x1b[0m", report::connectivity_banner(api_url));
        }
        Stage::RankingLoaded { filter, view, api_url, .. } => {
            print_kpis(view, api_url);
            if view.below_threshold() {
                eprintln!("\x1b[33m{}\x1b[0m", report::below_threshold(filter.min_reviews));
                return;
            }

            println!("\x1b[1mRanking: top {} critical products\x1b[0m", view.visible.len());
            println!("{:>6}  {:<14} {:>10} {:>9} {:>11}", "RANK", "ASIN", "NEGATIVE", "REVIEWS", "COMPLAINTS");
            println!("{}", "─".repeat(56));
            for r in &view.visible {
                let color = if r.pct_neg >= 0.5 {
                    "\x1b[31m"
                } else if r.pct_neg >= 0.25 {
                    "\x1b[33m"
                } else {
                    "\x1b[32m"
                };
                println!(
                    "{:>6}  {:<14} {}{:>9.1}%\x1b[0m {:>9} {:>11}",
                    r.risk_rank,
                    truncate(&r.asin, 14),
                    color,
                    r.pct_neg * 100.0,
                    r.n_reviews,
                    r.n_neg
                );
            }
        }
        Stage::NoPeriod | Stage::PeriodSelected { .. } => {}
    }
}

fn print_kpis(view: &RankingView, api_url: &str) {
    let k = &view.kpis;
    eprintln!("\x1b[1mReturn Risk Monitor\x1b[0m  period {}", k.periodo);
    eprintln!("\x1b[2mAPI connected: {}\x1b[0m", api_url);
    eprintln!("{}", "─".repeat(56));
    eprintln!("  Products at risk:    {}", k.products_at_risk);
    eprintln!("  Avg. negative rate:  {:.1}%", k.avg_negative_rate);
    eprintln!("  Review volume:       {}", k.total_reviews);
    eprintln!();
}

fn print_drilldown(session: &Session) {
    let Some(sel) = session.selection() else {
        return;
    };

    println!("\x1b[1mCause analysis for {}\x1b[0m", sel.asin);
    match &sel.causes {
        CauseStage::Empty => println!("  {}", report::NO_CAUSES),
        CauseStage::Failed { .. } => eprintln!("  \x1b[31m{}\x1b[0m", report::CAUSES_FAILED),
        CauseStage::Loaded { causes, principal, evidence } => {
            let total: u32 = causes.iter().map(|c| c.conteo).sum();
            let widest = causes.iter().map(|c| c.causa.chars().count()).max().unwrap_or(0);
            for c in causes.iter().rev() {
                let share = if total > 0 { c.conteo as f64 / total as f64 * 100.0 } else { 0.0 };
                let bar = "█".repeat(((share / 5.0).round() as usize).max(1));
                println!("  {:<w$}  {:>5}  {:>5.1}%  {}", c.causa, c.conteo, share, bar, w = widest);
            }

            println!("\n\x1b[1mVoice of the customer: evidence for '{}'\x1b[0m", principal);
            match evidence {
                EvidenceStage::Loaded { items } => {
                    for item in items {
                        println!("  \x1b[33m{}\x1b[0m", report::evidence_line(item));
                    }
                }
                EvidenceStage::Empty => println!("  {}", report::NO_EVIDENCE),
                EvidenceStage::Failed { .. } => eprintln!("  \x1b[31m{}\x1b[0m", report::EVIDENCE_FAILED),
            }
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
