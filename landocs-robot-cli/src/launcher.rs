use landocs_robot::errors::RobotError;
use landocs_robot::AppLauncher;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::info;

/// Starts the executable detached; the robot never waits for it to exit.
pub struct ProcessLauncher;

impl AppLauncher for ProcessLauncher {
    fn launch(&self, app_path: &Path) -> Result<(), RobotError> {
        if !app_path.is_file() {
            return Err(RobotError::Config(format!(
                "application {} does not exist",
                app_path.display()
            )));
        }
        let mut command = Command::new(app_path);
        if let Some(dir) = app_path.parent() {
            command.current_dir(dir);
        }
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RobotError::io(app_path, e))?;
        info!(pid = child.id(), "started {}", app_path.display());
        Ok(())
    }
}
