//! Check requester: debounced, generation-tagged safety checks per row.
//!
//! Flow for one row:
//! 1. `schedule_check` arms the row's debounce timer
//! 2. `check` marks the row loading (synchronously), takes the next
//!    generation and snapshots the sibling medications
//! 3. The request runs on a spawned task; whatever comes back, success or
//!    failure, is handed to the projector with the same generation
//! 4. The projector drops it if a newer generation has been issued since

pub mod projector;
pub mod severity;

pub use projector::*;
pub use severity::*;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::config::TimingConfig;
use crate::debounce::Debouncer;
use crate::form::{lock_form, SharedForm};
use crate::models::{CheckRequest, Generation, RowId};
use crate::service::SafetyService;

/// Timers owned by the validator, one of each per row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TimerKey {
    Check(RowId),
    SafeNotice(RowId),
}

struct ValidatorInner {
    service: Arc<dyn SafetyService>,
    form: SharedForm,
    projector: Mutex<Projector>,
    timers: Debouncer<TimerKey>,
    timing: TimingConfig,
}

/// Cloneable handle to the check pipeline.
#[derive(Clone)]
pub struct Validator {
    inner: Arc<ValidatorInner>,
}

impl Validator {
    pub fn new(service: Arc<dyn SafetyService>, form: SharedForm, timing: TimingConfig) -> Self {
        Self {
            inner: Arc::new(ValidatorInner {
                service,
                form,
                projector: Mutex::new(Projector::new()),
                timers: Debouncer::new(),
                timing,
            }),
        }
    }

    fn projector(&self) -> MutexGuard<'_, Projector> {
        self.inner
            .projector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Check `row` once its name has been quiet for the check debounce.
    pub fn schedule_check(&self, row: &RowId) {
        let validator = self.clone();
        let target = row.clone();
        self.inner.timers.schedule(
            TimerKey::Check(row.clone()),
            self.inner.timing.check_debounce,
            move || {
                validator.check(&target);
            },
        );
    }

    /// Cancel a pending debounced check. Returns whether one was pending.
    pub fn cancel_scheduled(&self, row: &RowId) -> bool {
        self.inner.timers.cancel(&TimerKey::Check(row.clone()))
    }

    /// Check `row` now.
    ///
    /// Returns the handle of the request task, or `None` when no request was
    /// issued (unknown row, or empty name which clears the row instead).
    pub fn check(&self, row: &RowId) -> Option<JoinHandle<()>> {
        let name = {
            let form = lock_form(&self.inner.form);
            form.name(row)?.trim().to_string()
        };

        self.cancel_scheduled(row);
        self.inner.timers.cancel(&TimerKey::SafeNotice(row.clone()));

        if name.is_empty() {
            let generation = self.projector().clear(row);
            tracing::debug!(row = %row, %generation, "Cleared warnings for empty entry");
            return None;
        }

        let generation = self.projector().begin(row);
        let context = lock_form(&self.inner.form).read_context(&name);
        let request = CheckRequest::new(name, context, generation);

        tracing::debug!(
            row = %row,
            %generation,
            medication = %request.medication_name,
            siblings = request.existing_medications.len(),
            "Issuing safety check"
        );

        let validator = self.clone();
        let row = row.clone();
        Some(tokio::spawn(async move {
            let result = match validator.inner.service.check_medication(&request).await {
                Ok(outcome) => CheckResult::Evaluated(outcome),
                Err(e) => {
                    tracing::warn!(row = %row, generation = %request.generation, error = %e, "Safety check failed");
                    CheckResult::TransportError
                }
            };
            validator.apply(&row, request.generation, result);
        }))
    }

    /// Project a result onto `row` unless a newer check has been issued.
    pub fn apply(&self, row: &RowId, generation: Generation, result: CheckResult) -> ApplyOutcome {
        let outcome = self.projector().apply(row, generation, &result);

        match outcome {
            ApplyOutcome::Stale => {
                tracing::debug!(row = %row, %generation, "Discarded stale check result");
            }
            ApplyOutcome::Applied => {
                if matches!(&result, CheckResult::Evaluated(o) if o.safe && o.warnings.is_empty()) {
                    self.schedule_safe_dismissal(row, generation);
                }
            }
        }

        outcome
    }

    fn schedule_safe_dismissal(&self, row: &RowId, generation: Generation) {
        let validator = self.clone();
        let target = row.clone();
        self.inner.timers.schedule(
            TimerKey::SafeNotice(row.clone()),
            self.inner.timing.safe_notice,
            move || {
                validator.projector().dismiss_safe_notice(&target, generation);
            },
        );
    }

    /// Re-check every row that has a name, after the check debounce.
    pub fn recheck_all(&self) {
        let rows: Vec<RowId> = lock_form(&self.inner.form)
            .rows()
            .iter()
            .filter(|row| !row.name.trim().is_empty())
            .map(|row| row.id.clone())
            .collect();

        for row in &rows {
            self.schedule_check(row);
        }
    }

    /// Drop all state for a removed row. Late results for it are ignored.
    pub fn forget(&self, row: &RowId) {
        self.inner.timers.cancel(&TimerKey::Check(row.clone()));
        self.inner.timers.cancel(&TimerKey::SafeNotice(row.clone()));
        self.projector().remove(row);
    }

    pub fn row_view(&self, row: &RowId) -> Option<RowView> {
        self.projector().view(row).cloned()
    }

    pub fn current_generation(&self, row: &RowId) -> Generation {
        self.projector().current_generation(row)
    }
}
