//! Drug name suggestions (autocomplete).
//!
//! Same discipline as the safety check: every keystroke cancels the row's
//! pending fetch and re-arms it, and fetches carry a per-row generation so a
//! slow reply for an older query never opens a panel. Only one panel is open
//! at a time, anchored to the row it was fetched for.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::checker::Validator;
use crate::config::TimingConfig;
use crate::debounce::Debouncer;
use crate::form::{lock_form, SharedForm};
use crate::models::{Generation, RowId, Suggestion};
use crate::service::{SafetyService, ServiceError};

/// The open candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionPanel {
    pub row: RowId,
    pub query: String,
    pub candidates: Vec<Suggestion>,
}

/// Where a click landed, as far as the panel cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// Inside the suggestion panel anchored to this row.
    Panel(RowId),
    /// Inside this row's name field.
    Field(RowId),
    Elsewhere,
}

#[derive(Default)]
struct SuggestState {
    generations: HashMap<RowId, Generation>,
    panel: Option<SuggestionPanel>,
}

impl SuggestState {
    fn advance(&mut self, row: &RowId) -> Generation {
        let generation = self.generations.entry(row.clone()).or_default();
        *generation = generation.next();
        *generation
    }

    fn is_current(&self, row: &RowId, generation: Generation) -> bool {
        self.generations.get(row) == Some(&generation)
    }

    fn close_for(&mut self, row: &RowId) {
        if self.panel.as_ref().is_some_and(|panel| &panel.row == row) {
            self.panel = None;
        }
    }
}

struct SuggestInner {
    service: Arc<dyn SafetyService>,
    form: SharedForm,
    validator: Validator,
    timers: Debouncer<RowId>,
    timing: TimingConfig,
    state: Mutex<SuggestState>,
}

#[derive(Clone)]
pub struct SuggestionPipeline {
    inner: Arc<SuggestInner>,
}

impl SuggestionPipeline {
    pub fn new(
        service: Arc<dyn SafetyService>,
        form: SharedForm,
        validator: Validator,
        timing: TimingConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SuggestInner {
                service,
                form,
                validator,
                timers: Debouncer::new(),
                timing,
                state: Mutex::new(SuggestState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SuggestState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keystroke in a name field.
    pub fn on_input(&self, row: &RowId, query: &str) {
        self.inner.timers.cancel(row);
        let query = query.trim().to_string();
        let generation = self.state().advance(row);

        if query.chars().count() < self.inner.timing.min_query_chars {
            self.hide();
            return;
        }

        let pipeline = self.clone();
        let target = row.clone();
        self.inner.timers.schedule(row.clone(), self.inner.timing.suggest_debounce, move || {
            pipeline.fetch(target, query, generation);
        });
    }

    fn fetch(&self, row: RowId, query: String, generation: Generation) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let result = pipeline.inner.service.suggest(&query).await;
            pipeline.deliver(row, query, generation, result);
        })
    }

    fn deliver(
        &self,
        row: RowId,
        query: String,
        generation: Generation,
        result: Result<Vec<Suggestion>, ServiceError>,
    ) {
        let mut state = self.state();
        if !state.is_current(&row, generation) {
            tracing::trace!(row = %row, %generation, "Discarded stale suggestions");
            return;
        }

        match result {
            Ok(mut candidates) if !candidates.is_empty() => {
                candidates.truncate(self.inner.timing.max_suggestions);
                tracing::debug!(row = %row, count = candidates.len(), "Suggestions ready");
                state.panel = Some(SuggestionPanel {
                    row,
                    query,
                    candidates,
                });
            }
            Ok(_) => state.close_for(&row),
            Err(e) => {
                tracing::warn!(row = %row, error = %e, "Suggestion fetch failed");
                state.close_for(&row);
            }
        }
    }

    /// Pick candidate `index` from the panel open on `row`: write it into the
    /// field, close the panel and check the medication straight away.
    pub fn select(&self, row: &RowId, index: usize) -> Option<String> {
        let name = {
            let mut state = self.state();
            let panel = state.panel.as_ref().filter(|panel| &panel.row == row)?;
            let name = panel.candidates.get(index)?.name.clone();
            state.panel = None;
            state.advance(row);
            name
        };

        self.inner.timers.cancel(row);
        if !lock_form(&self.inner.form).set_name(row, &name) {
            return None;
        }
        self.inner.validator.check(row);
        Some(name)
    }

    /// Clicks outside the open panel and its source field close the panel.
    pub fn on_click(&self, target: &ClickTarget) {
        let mut state = self.state();
        let keep = match (&state.panel, target) {
            (Some(panel), ClickTarget::Panel(row) | ClickTarget::Field(row)) => &panel.row == row,
            _ => false,
        };
        if !keep {
            state.panel = None;
        }
    }

    pub fn hide(&self) {
        self.state().panel = None;
    }

    pub fn panel(&self) -> Option<SuggestionPanel> {
        self.state().panel.clone()
    }

    /// Drop state for a removed row.
    pub fn forget(&self, row: &RowId) {
        self.inner.timers.cancel(row);
        let mut state = self.state();
        state.advance(row);
        state.close_for(row);
    }
}
