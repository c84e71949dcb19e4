//! Starting a LanDocs session: profile install, launch, main window wait.

use crate::element::UIElement;
use crate::errors::RobotError;
use crate::landocs::APP_WINDOW_NAME;
use crate::platforms::AccessibilityEngine;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

/// Starts the application process.
pub trait AppLauncher: Send + Sync {
    fn launch(&self, app_path: &Path) -> Result<(), RobotError>;
}

/// Copies `custom_file` into `profile_dir`. An existing file of the same name
/// is kept as `<name>.bak`, replacing any previous backup.
pub fn install_profile(custom_file: &Path, profile_dir: &Path) -> Result<PathBuf, RobotError> {
    if !custom_file.is_file() {
        return Err(RobotError::Config(format!(
            "custom profile {} does not exist",
            custom_file.display()
        )));
    }
    if !profile_dir.is_dir() {
        return Err(RobotError::Config(format!(
            "profile folder {} does not exist",
            profile_dir.display()
        )));
    }
    let file_name = custom_file.file_name().ok_or_else(|| {
        RobotError::Config(format!("{} has no file name", custom_file.display()))
    })?;
    let destination = profile_dir.join(file_name);

    if destination.exists() {
        let mut backup = destination.clone().into_os_string();
        backup.push(".bak");
        let backup = PathBuf::from(backup);
        if backup.exists() {
            fs::remove_file(&backup).map_err(|e| RobotError::io(&backup, e))?;
        }
        fs::rename(&destination, &backup).map_err(|e| RobotError::io(&destination, e))?;
        debug!("previous profile kept as {}", backup.display());
    }
    fs::copy(custom_file, &destination).map_err(|e| RobotError::io(&destination, e))?;
    info!("profile installed to {}", destination.display());
    Ok(destination)
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app_path: PathBuf,
    pub custom_profile: Option<PathBuf>,
    pub profile_folder: Option<PathBuf>,
    pub window_name: String,
    pub window_timeout: Duration,
    pub window_poll: Duration,
    pub settle: Duration,
}

impl SessionConfig {
    pub fn new(app_path: impl Into<PathBuf>) -> Self {
        Self {
            app_path: app_path.into(),
            custom_profile: None,
            profile_folder: None,
            window_name: APP_WINDOW_NAME.to_string(),
            window_timeout: Duration::from_secs(300),
            window_poll: Duration::from_secs(1),
            settle: Duration::from_secs(5),
        }
    }
}

/// Installs the profile, launches LanDocs and waits for its main window.
pub struct ApplicationSession {
    config: SessionConfig,
    launcher: Arc<dyn AppLauncher>,
}

impl ApplicationSession {
    pub fn new(config: SessionConfig, launcher: Arc<dyn AppLauncher>) -> Self {
        Self { config, launcher }
    }

    #[instrument(level = "info", skip(self, engine), fields(app = %self.config.app_path.display()))]
    pub async fn start(&self, engine: &dyn AccessibilityEngine) -> Result<UIElement, RobotError> {
        if let (Some(profile), Some(folder)) =
            (&self.config.custom_profile, &self.config.profile_folder)
        {
            install_profile(profile, folder)?;
        }
        self.launcher.launch(&self.config.app_path)?;
        let window = find_top_level_window(
            engine,
            &self.config.window_name,
            self.config.window_timeout,
            self.config.window_poll,
        )
        .await?;
        sleep(self.config.settle).await;
        Ok(window)
    }
}

/// Polls the desktop's direct children for a window with exactly this name.
pub async fn find_top_level_window(
    engine: &dyn AccessibilityEngine,
    name: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<UIElement, RobotError> {
    let started = Instant::now();
    loop {
        let root = engine.get_root_element()?;
        if let Some(window) = root
            .children()?
            .into_iter()
            .find(|w| w.name().as_deref() == Some(name))
        {
            info!("window '{name}' appeared after {:?}", started.elapsed());
            return Ok(window);
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(RobotError::NotFound(format!(
                "window '{name}' did not appear within {timeout:?}"
            )));
        }
        sleep(poll.min(timeout - elapsed)).await;
    }
}
