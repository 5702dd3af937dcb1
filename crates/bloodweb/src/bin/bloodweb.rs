//! bloodweb CLI: board detection and claim planning on saved captures.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bloodweb::io::{load_captures, BloodwebConfig, BoardReport};
use bloodweb::{detect_board, plan_claims, NoopObserver, SelectorParams};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "bloodweb")]
#[command(about = "Detect bloodweb boards in saved captures and plan the claim order")]
#[command(version)]
struct Cli {
    /// Level of the stderr logger.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log through a tracing subscriber with stage timings.
    #[arg(long, global = true)]
    tracing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the board and print nodes and connections.
    Detect(ReplayArgs),

    /// Detect the board, then claim everything in selector order.
    Plan {
        #[command(flatten)]
        replay: ReplayArgs,

        /// Ignore lookahead and anchor distance; highest value first.
        #[arg(long)]
        greedy: bool,
    },
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// JSON config (see `BloodwebConfig`).
    #[arg(long)]
    config: PathBuf,

    /// Captures of the same board, at native resolution.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn init_logging(cli: &Cli) {
    #[cfg(feature = "tracing")]
    {
        if cli.tracing {
            bloodweb::core::init_tracing(false);
            return;
        }
    }
    #[cfg(not(feature = "tracing"))]
    {
        if cli.tracing {
            eprintln!("warning: built without the `tracing` feature, using the plain logger");
        }
    }
    let _ = bloodweb::core::init_with_level(cli.log_level.into());
}

/// How `plan` picks nodes.
#[derive(Clone, Copy)]
enum PlanMode {
    Configured,
    Greedy,
}

/// `Ok(false)` when the board could not be detected; the report says why.
fn run_replay(args: &ReplayArgs, plan: Option<PlanMode>) -> CliResult<bool> {
    let cfg = BloodwebConfig::load_json(&args.config)?;
    let base = args.config.parent().unwrap_or(Path::new("."));
    let atlas = cfg.load_atlas(base)?;
    let views = load_captures(&args.images, &cfg.screen_scale())?;
    log::info!("{} capture(s), {} template(s)", views.len(), atlas.len());

    let mut report = BoardReport::new(&args.images, &args.config);
    let detected = match detect_board(&cfg.build_detector(), &atlas, &views, &mut NoopObserver) {
        Ok(mut graph) => {
            report.set_graph(&graph);
            if let Some(mode) = plan {
                let params = match mode {
                    PlanMode::Configured => cfg.selector,
                    PlanMode::Greedy => SelectorParams::greedy(),
                };
                report.set_claim_order(plan_claims(&mut graph, params, &mut NoopObserver));
            }
            true
        }
        Err(e) => {
            log::error!("{e}");
            report.set_error(&e);
            false
        }
    };

    match &args.out {
        Some(path) => {
            report.write_json(path)?;
            log::info!("report written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(detected)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Commands::Detect(args) => run_replay(args, None),
        Commands::Plan { replay, greedy } => {
            let mode = if *greedy {
                PlanMode::Greedy
            } else {
                PlanMode::Configured
            };
            run_replay(replay, Some(mode))
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
