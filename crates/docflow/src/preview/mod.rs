//! Projection of a preview payload into a renderable grid.

mod badge;

use std::collections::HashSet;

use serde::Serialize;

use crate::api::{PreviewPayload, PreviewRow};
use crate::error::{ApiError, PreviewError};

pub use badge::{ValidationBadge, ValidationOutcome};

/// One cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub header: String,
    pub value: String,
    /// Badge of the validation whose field matches this column, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<ValidationBadge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub cells: Vec<GridCell>,
    /// Every validation of the row, in payload order.
    pub badges: Vec<ValidationBadge>,
}

impl GridRow {
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationBadge> {
        self.badges.iter().filter(|b| b.outcome.is_warning())
    }
}

/// Renderable table built from a preview payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewGrid {
    pub job_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<GridRow>,
    pub total_rows: u64,
}

impl PreviewGrid {
    /// True when the service sent fewer rows than it holds.
    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len() as u64
    }

    pub fn warning_count(&self) -> usize {
        self.rows.iter().map(|row| row.warnings().count()).sum()
    }
}

/// Preview section of a job view.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    /// The service has not generated a preview for the job yet.
    NotReady,
    /// The preview could not be fetched (transport or unexpected failure).
    Unavailable { reason: String },
    Ready { grid: PreviewGrid },
    /// The payload arrived but is malformed.
    Invalid { error: PreviewError },
}

impl PreviewState {
    /// Folds a preview fetch into a view state. Never fails: preview problems
    /// must not take down the rest of the view.
    pub fn from_fetch(result: Result<PreviewPayload, ApiError>) -> Self {
        match result {
            Ok(payload) => match project(&payload) {
                Ok(grid) => PreviewState::Ready { grid },
                Err(error) => {
                    log::error!("Rejected preview for job {}: {}", payload.job_id, error);
                    PreviewState::Invalid { error }
                }
            },
            Err(err) if err.is_not_found() => PreviewState::NotReady,
            Err(err) => {
                log::warn!("Preview unavailable: {}", err);
                PreviewState::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn grid(&self) -> Option<&PreviewGrid> {
        match self {
            PreviewState::Ready { grid } => Some(grid),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewState::Ready { .. })
    }
}

/// Builds the grid, rejecting payloads whose rows do not line up with the
/// headers.
pub fn project(payload: &PreviewPayload) -> Result<PreviewGrid, PreviewError> {
    let rows = payload
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| project_row(index, row, &payload.headers))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PreviewGrid {
        job_id: payload.job_id.clone(),
        headers: payload.headers.clone(),
        rows,
        total_rows: payload.total_rows,
    })
}

fn project_row(index: usize, row: &PreviewRow, headers: &[String]) -> Result<GridRow, PreviewError> {
    if row.columns.len() != headers.len() {
        return Err(PreviewError::DataIntegrity {
            row: index,
            expected: headers.len(),
            actual: row.columns.len(),
        });
    }

    let mut seen = HashSet::with_capacity(row.validations.len());
    for validation in &row.validations {
        if !seen.insert(validation.field.as_str()) {
            return Err(PreviewError::DuplicateValidation {
                row: index,
                field: validation.field.clone(),
            });
        }
    }

    let badges: Vec<ValidationBadge> = row
        .validations
        .iter()
        .map(ValidationBadge::from_result)
        .collect();

    let cells = headers
        .iter()
        .zip(&row.columns)
        .map(|(header, value)| GridCell {
            header: header.clone(),
            value: value.clone(),
            badge: badges.iter().find(|b| &b.field == header).cloned(),
        })
        .collect();

    Ok(GridRow { cells, badges })
}
