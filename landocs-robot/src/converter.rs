use crate::errors::ConverterError;
use crate::reconcile::strip_completion_suffix;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Turns one spreadsheet into a fixed-layout document.
#[async_trait]
pub trait SpreadsheetConverter: Send + Sync {
    /// Writes the document to `output`, which does not exist yet.
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConverterError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// `<stem without completion suffix>.pdf` with characters that are invalid
/// in Windows file names replaced by `_`.
pub fn converted_document_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (base, _) = strip_completion_suffix(stem.trim());
    let sanitized: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("{sanitized}.pdf")
}

#[derive(Debug, Default)]
pub struct ConversionReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Converts every input into `output_dir`. A failed file is logged and the
/// rest still convert.
pub async fn convert_all(
    converter: &dyn SpreadsheetConverter,
    inputs: &[PathBuf],
    output_dir: &Path,
) -> ConversionReport {
    let mut report = ConversionReport::default();
    for input in inputs {
        let output = output_dir.join(converted_document_name(input));
        let result = if input.is_file() {
            converter.convert(input, &output).await
        } else {
            Err(ConverterError::InputNotFound {
                path: input.clone(),
            })
        };
        match result {
            Ok(()) => {
                info!(converter = converter.name(), "converted {} -> {}", input.display(), output.display());
                report.converted.push(output);
            }
            Err(e) => {
                error!(converter = converter.name(), "conversion of {} failed: {e}", input.display());
                report.failed.push((input.clone(), e.to_string()));
            }
        }
    }
    report
}
