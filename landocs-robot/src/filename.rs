use crate::errors::RobotError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ACT_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Акт св П \d+\s+(.*?)\s+№(\S+)\s+(\d{2}\.\d{2}\.\d{2})_(\d+)(?:_(\d+))?$")
        .unwrap_or_else(|e| unreachable!("reconciliation act pattern is valid: {e}"))
});

/// Business fields carried by a reconciliation act's file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFileName {
    pub counterparty_name: String,
    pub document_number: String,
    /// `DD.MM.YY`
    pub document_date: String,
    pub tax_id: String,
    pub secondary_tax_code: Option<String>,
}

/// Parses a base name such as
/// `Акт св П 12 ООО Ромашка №45 01.02.23_770123456_770101001`.
pub fn parse_file_name(base_name: &str) -> Result<ParsedFileName, RobotError> {
    let captures = ACT_FILE_NAME
        .captures(base_name.trim())
        .ok_or_else(|| RobotError::ParseFailure(base_name.to_string()))?;
    let field = |i: usize| {
        captures
            .get(i)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };
    Ok(ParsedFileName {
        counterparty_name: field(1),
        document_number: field(2),
        document_date: field(3),
        tax_id: field(4),
        secondary_tax_code: captures.get(5).map(|m| m.as_str().trim().to_string()),
    })
}
