//! LanDocs robot runner.
//!
//! Usage:
//!   landocs-robot --config robot.yaml
//!   landocs-robot --config robot.yaml --input D:\tickets --skip-landocs

use anyhow::{Context, Result};
use clap::Parser;
use landocs_robot::platforms::create_engine;
use landocs_robot::{
    ApplicationSession, LandocsDriver, Orchestrator, Robot, RobotConfig, SessionConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod converter;
mod launcher;
mod logging;

use converter::CommandConverter;
use launcher::ProcessLauncher;

#[derive(Parser, Debug)]
#[command(name = "landocs-robot")]
#[command(about = "Reconciles ticket folders and registers their documents in LanDocs")]
struct Args {
    /// Robot configuration (YAML); defaults to `<config dir>/landocs-robot/robot.yaml`
    #[clap(long, short = 'c', env = "LANDOCS_ROBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `input_folder_path` from the configuration
    #[clap(long, short = 'i')]
    input: Option<PathBuf>,

    /// Overrides `log_dir` from the configuration
    #[clap(long, env = "LANDOCS_ROBOT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Only reconcile and convert files, never touch LanDocs
    #[clap(long)]
    skip_landocs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path().context("no --config given and no user config folder")?,
    };
    let mut config = RobotConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(input) = args.input {
        config.input_folder_path = input;
    }
    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }

    let _guard = logging::init_logging(&config)?;
    info!(
        config = %config_path.display(),
        input = %config.input_folder_path.display(),
        "LanDocs robot starting"
    );

    let converter = Arc::new(CommandConverter::from_config(&config.converter));
    let mut robot = Robot::from_config(&config, converter)?;
    if args.skip_landocs {
        info!("LanDocs registration skipped, reconciling only");
    } else {
        robot = robot.with_landocs(landocs_driver(&config)?);
    }

    let summary = match robot.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("run failed: {e}");
            return Err(e.into());
        }
    };
    info!(
        "run summary: {}",
        serde_json::to_string_pretty(&summary).context("serializing run summary")?
    );
    info!(
        completed = summary.completed(),
        abandoned = summary.abandoned(),
        "LanDocs robot finished"
    );
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("landocs-robot").join("robot.yaml"))
}

fn landocs_driver(config: &RobotConfig) -> Result<LandocsDriver> {
    let app_path = config
        .landocs_app_path
        .clone()
        .context("landocs_app_path is required unless --skip-landocs is given")?;
    let (engine, input) = create_engine().context("connecting to UI Automation")?;

    let timings = &config.timings;
    let mut session = SessionConfig::new(app_path);
    session.custom_profile = config.landocs_custom_profile.clone();
    session.profile_folder = config.landocs_profile_folder.clone();
    session.window_timeout = Duration::from_secs(timings.app_window_timeout_secs);
    session.window_poll = Duration::from_millis(timings.app_window_poll_ms);
    session.settle = Duration::from_millis(timings.app_settle_ms);

    Ok(LandocsDriver {
        engine: engine.clone(),
        orchestrator: Orchestrator::new(engine, input).with_options(timings.workflow_options()),
        session: ApplicationSession::new(session, Arc::new(ProcessLauncher)),
        signatory: config.signatory.clone(),
    })
}
