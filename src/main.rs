use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kinetrack::{
    build_detector, leaderboard, Activity, AnalysisSessionBuilder, EventBus, EventFilter,
    EventReceiver, JsonlResultStore, JumpVariant, KeyboardInputHandler, KinetrackConfig,
    LandmarkFileSource, ResultStore, SessionLimits,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "kinetrack")]
#[command(about = "Fitness assessment from pose landmarks: push-ups, vertical jump and punches")]
#[command(version)]
#[command(long_about = "Analyzes recorded or live pose-landmark streams produced by an external \
pose estimator, counts push-ups and punches, estimates vertical jump height, and keeps an \
append-only result store with per-activity leaderboards.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "kinetrack.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, global = true, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, global = true, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", help = "Write logs to a file in addition to stderr")]
    log_file: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a landmark recording and record the result
    Analyze {
        /// pushups, jump or punches
        activity: Activity,

        /// JSON-lines landmark recording
        input: PathBuf,

        #[arg(long, default_value_t = 0)]
        user_id: u64,

        /// Subject height in centimeters (jump only)
        #[arg(long)]
        height_cm: Option<f64>,

        /// stabilized or running_extremes (jump only)
        #[arg(long, value_parser = parse_jump_variant)]
        jump_variant: Option<JumpVariant>,

        /// Treat the input as a live stream: wall-clock duration and time limit
        #[arg(long)]
        live: bool,

        /// Override the session time limit, in seconds
        #[arg(long)]
        duration_limit: Option<u64>,

        /// Stop the session with q or Esc
        #[arg(long)]
        interactive: bool,

        /// Print the result without recording it
        #[arg(long)]
        no_store: bool,
    },
    /// Show the best stored results for an activity
    Leaderboard {
        activity: Activity,

        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

fn parse_jump_variant(s: &str) -> std::result::Result<JumpVariant, String> {
    match s {
        "stabilized" => Ok(JumpVariant::Stabilized),
        "running_extremes" | "running-extremes" => Ok(JumpVariant::RunningExtremes),
        other => Err(format!("unknown jump variant '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting kinetrack v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match KinetrackConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let Some(command) = args.command else {
        eprintln!("No command given; see `kinetrack --help`");
        std::process::exit(2);
    };

    match command {
        Command::Analyze {
            activity,
            input,
            user_id,
            height_cm,
            jump_variant,
            live,
            duration_limit,
            interactive,
            no_store,
        } => {
            if let Some(height_cm) = height_cm {
                config.jump.user_height_cm = height_cm;
            }
            if let Some(variant) = jump_variant {
                config.jump.variant = variant;
            }
            if let Some(seconds) = duration_limit {
                if live {
                    config.session.live_duration_limit_seconds = seconds;
                } else {
                    config.session.file_duration_limit_seconds = seconds;
                }
            }
            config.validate().context("Invalid configuration")?;

            analyze(
                &config,
                activity,
                input,
                user_id,
                live,
                interactive,
                !no_store,
            )
            .await
        }
        Command::Leaderboard { activity, limit } => {
            show_leaderboard(&config, activity, limit).await
        }
    }
}

async fn analyze(
    config: &KinetrackConfig,
    activity: Activity,
    input: PathBuf,
    user_id: u64,
    live: bool,
    interactive: bool,
    store_result: bool,
) -> Result<()> {
    let source = LandmarkFileSource::open(&input, &config.source)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let cancellation_token = CancellationToken::new();
    let event_bus = EventBus::new(config.session.event_bus_capacity);

    // Progress lines on stderr while the session runs
    let mut progress = EventReceiver::new(
        event_bus.subscribe(),
        EventFilter::EventTypes(vec!["counter_advanced", "detector_ready"]),
    );
    let progress_task = tokio::spawn(async move {
        while let Ok(event) = progress.recv().await {
            eprintln!("{}", event.description());
        }
    });

    let keyboard = interactive.then(|| KeyboardInputHandler::new(cancellation_token.clone()));
    if let Some(keyboard) = &keyboard {
        keyboard.start()?;
    }

    let ctrl_c_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing session with what was read so far");
            ctrl_c_token.cancel();
        }
    });

    let session = AnalysisSessionBuilder::new()
        .user_id(user_id)
        .source(Box::new(source))
        .detector(build_detector(activity, config))
        .limits(SessionLimits::from_config(&config.session, live))
        .cancellation_token(cancellation_token)
        .event_bus(event_bus.clone())
        .build()?;

    let outcome = session.run().await;

    if let Some(keyboard) = &keyboard {
        keyboard.stop().await?;
    }
    drop(event_bus);
    let _ = progress_task.await;

    let outcome = outcome?;
    info!(
        "Stopped on {} after {} frames ({} with a pose)",
        outcome.stop_reason, outcome.frames_read, outcome.frames_with_pose
    );
    println!("{}", outcome.result.summary());

    if store_result {
        let store = JsonlResultStore::open(&config.store.path).await?;
        store.record(&outcome.result).await?;
        info!("Result {} recorded", outcome.result.id);
    }

    Ok(())
}

async fn show_leaderboard(
    config: &KinetrackConfig,
    activity: Activity,
    limit: usize,
) -> Result<()> {
    let store = JsonlResultStore::open(&config.store.path).await?;
    let entries = leaderboard(&store, activity, limit).await?;

    if entries.is_empty() {
        println!("No {} results yet", activity);
        return Ok(());
    }

    let unit = match activity {
        Activity::Jump => "cm",
        Activity::Pushups => "push-ups",
        Activity::Punches => "punches",
    };
    for entry in entries {
        println!(
            "{:>3}. user {:<8} {:>8.2} {:<9} {}",
            entry.rank,
            entry.user_id,
            entry.score,
            unit,
            entry.analyzed_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kinetrack={}", log_level)));

    let stderr_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_writer(std::io::stderr).boxed()
        }
    };

    let (file_layer, guard) = match &args.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Kinetrack Configuration File");
    println!("# Every option with its default value");
    println!("# KINETRACK__SECTION__KEY environment variables override any of them");
    println!();
    println!("{}", KinetrackConfig::default().to_toml()?);
    Ok(())
}
