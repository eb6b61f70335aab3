use serde::Serialize;

use crate::api::ValidationResult;

/// Two-way classification of a field validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Ok,
    /// Any status other than `ok`. The message, when present, is shown as
    /// supplementary detail.
    Warning { message: Option<String> },
}

impl ValidationOutcome {
    pub fn classify(status: &str, message: Option<&str>) -> Self {
        if status == "ok" {
            ValidationOutcome::Ok
        } else {
            ValidationOutcome::Warning {
                message: message.map(str::to_string),
            }
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationOutcome::Warning { .. })
    }
}

/// Badge rendered next to a validated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationBadge {
    pub field: String,
    /// Raw status, shown as the badge label.
    pub label: String,
    pub outcome: ValidationOutcome,
}

impl ValidationBadge {
    pub fn from_result(result: &ValidationResult) -> Self {
        Self {
            field: result.field.clone(),
            label: result.status.to_uppercase(),
            outcome: ValidationOutcome::classify(&result.status, result.message.as_deref()),
        }
    }

    /// Tooltip text, if any.
    pub fn detail(&self) -> Option<&str> {
        match &self.outcome {
            ValidationOutcome::Ok => None,
            ValidationOutcome::Warning { message } => message.as_deref(),
        }
    }
}
