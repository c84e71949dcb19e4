use async_trait::async_trait;
use landocs_robot::config::ConverterConfig;
use landocs_robot::errors::ConverterError;
use landocs_robot::SpreadsheetConverter;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs an external program once per spreadsheet.
///
/// Arguments may carry `{input}`, `{output}` and `{outdir}`. Converters that
/// only accept an output folder (soffice writes `<stem>.pdf` there) are
/// handled by renaming their result to the requested output name.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandConverter {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn render_args(&self, input: &Path, output: &Path, outdir: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
                    .replace("{outdir}", &outdir.to_string_lossy())
            })
            .collect()
    }
}

#[async_trait]
impl SpreadsheetConverter for CommandConverter {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConverterError> {
        if !input.is_file() {
            return Err(ConverterError::InputNotFound {
                path: input.to_path_buf(),
            });
        }
        let outdir = output.parent().unwrap_or(Path::new("."));
        let args = self.render_args(input, output, outdir);
        debug!(program = %self.program, ?args, "running converter");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConverterError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(ConverterError::ConversionFailed {
                reason: format!("{} exited with {}", self.program, result.status),
                stderr: (!stderr.is_empty()).then_some(stderr),
            });
        }
        if output.is_file() {
            return Ok(());
        }

        let produced = produced_by_outdir_converter(input, outdir);
        if produced.is_file() {
            if produced != output {
                tokio::fs::rename(&produced, output).await?;
            }
            return Ok(());
        }
        warn!("{} reported success but wrote nothing", self.program);
        Err(ConverterError::ConversionFailed {
            reason: format!("{} was not created", output.display()),
            stderr: None,
        })
    }

    fn name(&self) -> &str {
        &self.program
    }
}

fn produced_by_outdir_converter(input: &Path, outdir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    outdir.join(format!("{stem}.pdf"))
}
