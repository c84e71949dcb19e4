use serde::{Deserialize, Serialize};

const TAX_ID_LABEL: &str = "ИНН:";
const SECONDARY_CODE_LABEL: &str = "КПП:";

/// One row of the counterparty picker: labelled attribute strings such as
/// `ИНН:7701234567`, `КПП:770101001` and the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub index: usize,
    pub attributes: Vec<String>,
}

impl CandidateRecord {
    /// Splits a row value on `,`.
    pub fn from_value(index: usize, raw: &str) -> Self {
        Self {
            index,
            attributes: raw.split(',').map(|v| v.trim().to_string()).collect(),
        }
    }
}

/// Identity the resolver looks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyQuery {
    pub tax_id: String,
    pub secondary_code: Option<String>,
    pub display_name: Option<String>,
}

fn normalize(value: &str) -> String {
    value.replace(' ', "").trim().to_lowercase()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Index of the first candidate matching `query`, in enumeration order.
///
/// The tax id must equal one attribute. With a secondary code that code must
/// equal one attribute too; without it the display name must be a substring
/// of some attribute.
pub fn resolve(candidates: &[CandidateRecord], query: &CounterpartyQuery) -> Option<usize> {
    let tax_id = normalize(&format!("{TAX_ID_LABEL}{}", query.tax_id));
    let secondary = non_empty(&query.secondary_code)
        .map(|code| normalize(&format!("{SECONDARY_CODE_LABEL}{code}")));
    let name = non_empty(&query.display_name).map(normalize);

    candidates
        .iter()
        .find(|candidate| {
            let attributes: Vec<String> = candidate.attributes.iter().map(|a| normalize(a)).collect();
            if !attributes.contains(&tax_id) {
                return false;
            }
            match (&secondary, &name) {
                (Some(code), _) => attributes.contains(code),
                (None, Some(name)) => attributes.iter().any(|a| a.contains(name.as_str())),
                (None, None) => false,
            }
        })
        .map(|candidate| candidate.index)
}
