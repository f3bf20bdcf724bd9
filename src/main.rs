//! Focus guard: replays landmark frames and redirects on sustained inattention.

use anyhow::Result;
use clap::Parser;
use focus_guard::{
    app::{AppConfig, ExecutorMode, FocusGuardApp, FrameSource},
    config::{Config, EXAMPLE_CONFIG},
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines frame file (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Log redirect actions instead of launching a browser
    #[arg(long)]
    dry_run: bool,

    /// Pace frames by their timestamps
    #[arg(long)]
    realtime: bool,

    /// Derive thresholds from calibration dispersion
    #[arg(long)]
    adaptive: bool,

    /// Override the redirect URL
    #[arg(long)]
    url: Option<String>,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Focus Guard");

    // Load configuration if provided
    let mut settings = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    if args.adaptive {
        settings.session.adaptive_thresholds = true;
    }
    if let Some(url) = args.url {
        settings.redirect.url = url;
    }

    let config = AppConfig {
        frame_source: args.input.map_or(FrameSource::Stdin, FrameSource::File),
        executor_mode: if args.dry_run {
            ExecutorMode::DryRun
        } else {
            ExecutorMode::Browser
        },
        realtime: args.realtime,
        settings,
    };

    // Create and run application
    let mut app = FocusGuardApp::new(config)?;
    let summary = app.run()?;
    app.shutdown();

    info!(
        "Summary: {} frames, {} opens, {} closes, final phase {}",
        summary.frames, summary.opens, summary.closes, summary.final_phase
    );

    Ok(())
}
