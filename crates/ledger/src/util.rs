//! Input normalization shared by the lifecycle operations.

use crate::{LedgerError, ResultLedger};

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidRecord(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parse a numeric form field the way the editing layer expects.
///
/// Blank input means the field is unset (`None`), never zero; anything that is
/// not a finite number is rejected so it cannot corrupt the aggregates.
///
/// ```
/// use ledger::numeric_field;
///
/// assert_eq!(numeric_field("  ").unwrap(), None);
/// assert_eq!(numeric_field("12.5").unwrap(), Some(12.5));
/// assert!(numeric_field("12,5").is_err());
/// ```
pub fn numeric_field(raw: &str) -> ResultLedger<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(LedgerError::InvalidNumeric(trimmed.to_string())),
    }
}
