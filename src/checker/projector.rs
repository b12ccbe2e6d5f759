//! Response projector: maps check results onto per-row view state.
//!
//! Every row carries the generation of its newest check. A result tagged
//! with an older generation is dropped without touching the row, so a slow
//! response can never repaint a row that has since been re-checked.
//! Successful results are projected from scratch each time: the warning
//! list is re-sorted and the styling tier recomputed, never patched.

use std::collections::HashMap;

use serde::Serialize;

use super::severity::{highest_severity, sort_by_severity};
use crate::models::{CheckOutcome, Generation, RowId, Severity, Warning};

/// Notice shown when a check could not be completed.
pub const UNAVAILABLE_MESSAGE: &str = "Unable to check medication";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// What came back for one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Evaluated(CheckOutcome),
    /// Network failure, non-2xx status or unusable body.
    TransportError,
}

/// Contents of a row's warning area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningSurface {
    Hidden,
    Loading,
    /// Transient "no concerns" acknowledgement.
    SafeNotice,
    Unavailable { message: String },
    /// Sorted most severe first.
    Warnings { warnings: Vec<Warning> },
}

/// Row highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowTier {
    Safe,
    Warning(Severity),
}

/// Coarse row state, derived from the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowUiState {
    Idle,
    Loading,
    Safe,
    HasWarnings(Severity),
    Unavailable,
}

/// Projection of one row, serialised to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub surface: WarningSurface,
    pub tier: Option<RowTier>,
    /// Newest generation issued for the row.
    pub generation: Generation,
    /// Generation whose result is currently shown, if any.
    pub applied: Option<Generation>,
}

impl RowView {
    fn new() -> Self {
        Self {
            surface: WarningSurface::Hidden,
            tier: None,
            generation: Generation::default(),
            applied: None,
        }
    }

    pub fn state(&self) -> RowUiState {
        match (&self.surface, self.tier) {
            (WarningSurface::Loading, _) => RowUiState::Loading,
            (WarningSurface::Unavailable { .. }, _) => RowUiState::Unavailable,
            (WarningSurface::Warnings { .. }, Some(RowTier::Warning(severity))) => {
                RowUiState::HasWarnings(severity)
            }
            (_, Some(RowTier::Safe)) => RowUiState::Safe,
            _ => RowUiState::Idle,
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        match &self.surface {
            WarningSurface::Warnings { warnings } => warnings,
            _ => &[],
        }
    }

    pub fn is_surface_empty(&self) -> bool {
        matches!(self.surface, WarningSurface::Hidden)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer check exists for the row (or the row is gone); nothing changed.
    Stale,
}

// ═══════════════════════════════════════════════════════════
// Projector
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct Projector {
    rows: HashMap<RowId, RowView>,
    /// Last generation of removed rows. A reused id resumes from here.
    retired: HashMap<RowId, Generation>,
}

impl Projector {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, row: &RowId) -> &mut RowView {
        let retired = &mut self.retired;
        self.rows.entry(row.clone()).or_insert_with(|| {
            let mut view = RowView::new();
            if let Some(generation) = retired.remove(row) {
                view.generation = generation;
            }
            view
        })
    }

    /// Start a check: advance the generation and show the loading state.
    /// Styling is left alone until a result lands.
    pub fn begin(&mut self, row: &RowId) -> Generation {
        let view = self.entry(row);
        view.generation = view.generation.next();
        view.surface = WarningSurface::Loading;
        view.generation
    }

    /// Empty input: hide everything and retire any in-flight check.
    pub fn clear(&mut self, row: &RowId) -> Generation {
        let view = self.entry(row);
        view.generation = view.generation.next();
        view.surface = WarningSurface::Hidden;
        view.tier = None;
        view.applied = None;
        view.generation
    }

    pub fn apply(&mut self, row: &RowId, generation: Generation, result: &CheckResult) -> ApplyOutcome {
        let Some(view) = self.rows.get_mut(row) else {
            return ApplyOutcome::Stale;
        };
        if generation < view.generation {
            return ApplyOutcome::Stale;
        }
        view.generation = generation;
        view.applied = Some(generation);

        match result {
            CheckResult::TransportError => {
                view.surface = WarningSurface::Unavailable {
                    message: UNAVAILABLE_MESSAGE.to_string(),
                };
            }
            CheckResult::Evaluated(outcome) if outcome.warnings.is_empty() => {
                if outcome.safe {
                    view.surface = WarningSurface::SafeNotice;
                    view.tier = Some(RowTier::Safe);
                } else {
                    view.surface = WarningSurface::Hidden;
                    view.tier = None;
                }
            }
            CheckResult::Evaluated(outcome) => {
                let mut warnings = outcome.warnings.clone();
                sort_by_severity(&mut warnings);
                view.tier = highest_severity(&warnings).map(RowTier::Warning);
                view.surface = WarningSurface::Warnings { warnings };
            }
        }

        ApplyOutcome::Applied
    }

    /// Hide the safe acknowledgement shown for `generation`, if it is still
    /// the one on screen. The safe tier stays.
    pub fn dismiss_safe_notice(&mut self, row: &RowId, generation: Generation) -> bool {
        match self.rows.get_mut(row) {
            Some(view)
                if view.generation == generation
                    && view.applied == Some(generation)
                    && view.surface == WarningSurface::SafeNotice =>
            {
                view.surface = WarningSurface::Hidden;
                true
            }
            _ => false,
        }
    }

    pub fn current_generation(&self, row: &RowId) -> Generation {
        self.rows.get(row).map(|view| view.generation).unwrap_or_default()
    }

    pub fn view(&self, row: &RowId) -> Option<&RowView> {
        self.rows.get(row)
    }

    pub fn remove(&mut self, row: &RowId) -> bool {
        match self.rows.remove(row) {
            Some(view) => {
                self.retired.insert(row.clone(), view.generation);
                true
            }
            None => false,
        }
    }
}
