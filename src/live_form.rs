//! Event wiring for a medication entry form.
//!
//! `LiveForm` is what a UI binding talks to: it forwards field events into
//! the shared form state, the check pipeline and the suggestion pipeline,
//! and hands back the views to draw.

use std::sync::Arc;

use crate::checker::{RowView, Validator};
use crate::config::ClientConfig;
use crate::form::{self, lock_form, FormState, SharedForm};
use crate::models::RowId;
use crate::service::{HttpSafetyService, SafetyService, ServiceError};
use crate::suggest::{ClickTarget, SuggestionPanel, SuggestionPipeline};

#[derive(Clone)]
pub struct LiveForm {
    form: SharedForm,
    validator: Validator,
    suggestions: SuggestionPipeline,
}

impl LiveForm {
    pub fn new(service: Arc<dyn SafetyService>, config: &ClientConfig) -> Self {
        Self::with_form(service, config, FormState::new())
    }

    /// Start from an existing form, e.g. one rebuilt with
    /// [`FormState::from_fields`].
    pub fn with_form(service: Arc<dyn SafetyService>, config: &ClientConfig, initial: FormState) -> Self {
        let form = form::shared(initial);
        let validator = Validator::new(Arc::clone(&service), form.clone(), config.timing.clone());
        let suggestions =
            SuggestionPipeline::new(service, form.clone(), validator.clone(), config.timing.clone());
        Self {
            form,
            validator,
            suggestions,
        }
    }

    /// Live form backed by the HTTP rules service described by `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self, ServiceError> {
        let service = HttpSafetyService::new(config)?;
        tracing::info!(url = %config.base(), "Rules service client ready");
        Ok(Self::new(Arc::new(service), config))
    }

    // ── Rows ─────────────────────────────────────────────

    pub fn add_row(&self) -> RowId {
        lock_form(&self.form).add_row()
    }

    pub fn remove_row(&self, row: &RowId) -> bool {
        let removed = lock_form(&self.form).remove_row(row);
        self.validator.forget(row);
        self.suggestions.forget(row);
        removed
    }

    // ── Field events ─────────────────────────────────────

    /// Keystroke in a medication name field.
    pub fn on_name_input(&self, row: &RowId, value: &str) {
        if !lock_form(&self.form).set_name(row, value) {
            tracing::debug!(row = %row, "Name input for unknown row ignored");
            return;
        }
        self.validator.schedule_check(row);
        self.suggestions.on_input(row, value);
    }

    pub fn on_doses_input(&self, row: &RowId, value: &str) -> bool {
        lock_form(&self.form).set_doses(row, value)
    }

    /// Age feeds every check, so every filled row is re-checked.
    pub fn on_age_input(&self, value: &str) {
        lock_form(&self.form).set_age(value);
        self.validator.recheck_all();
    }

    pub fn select_suggestion(&self, row: &RowId, index: usize) -> Option<String> {
        self.suggestions.select(row, index)
    }

    pub fn on_click(&self, target: &ClickTarget) {
        self.suggestions.on_click(target);
    }

    // ── Reads ────────────────────────────────────────────

    pub fn row_view(&self, row: &RowId) -> Option<RowView> {
        self.validator.row_view(row)
    }

    pub fn suggestion_panel(&self) -> Option<SuggestionPanel> {
        self.suggestions.panel()
    }

    pub fn form_snapshot(&self) -> FormState {
        lock_form(&self.form).clone()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::checker::{RowTier, RowUiState};
    use crate::models::{CheckOutcome, Severity, Suggestion, Warning};
    use crate::render;
    use crate::service::MockSafetyService;

    fn warning(severity: Severity, title: &str) -> Warning {
        Warning {
            severity,
            icon: "⚠️".into(),
            title: title.into(),
            message: format!("{title} message"),
            recommendation: None,
            category: None,
        }
    }

    fn live(mock: MockSafetyService) -> (Arc<MockSafetyService>, LiveForm) {
        let mock = Arc::new(mock);
        let form = LiveForm::new(mock.clone(), &ClientConfig::default());
        (mock, form)
    }

    async fn type_slowly(form: &LiveForm, row: &RowId, text: &str) {
        for end in 1..=text.len() {
            form.on_name_input(row, &text[..end]);
            tokio::time::sleep(Duration::from_millis(80)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn typing_diphenhydramine_shows_one_high_warning() {
        let (mock, form) = live(MockSafetyService::new().on_check(
            "diphenhydramine",
            Ok(CheckOutcome::with_warnings(vec![warning(Severity::High, "Anticholinergic effects")])),
        ));
        let row = form.add_row();

        type_slowly(&form, &row, "diphenhydramine").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(mock.check_count(), 1);
        let view = form.row_view(&row).unwrap();
        assert_eq!(view.state(), RowUiState::HasWarnings(Severity::High));
        assert_eq!(render::row_class(&view), Some("row-warning-high"));
        assert_eq!(render::surface_html(&view).matches("warning-item").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gibberish_hides_surface_without_error() {
        let (_, form) = live(MockSafetyService::new());
        let row = form.add_row();

        form.on_name_input(&row, "asdfghjkl");
        tokio::time::sleep(Duration::from_secs(1)).await;

        let view = form.row_view(&row).unwrap();
        assert!(view.is_surface_empty());
        assert_eq!(view.tier, None);
        assert_eq!(render::surface_html(&view), "");
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_field_removes_warnings_without_request() {
        let (mock, form) = live(MockSafetyService::new().on_check(
            "warfarin",
            Ok(CheckOutcome::with_warnings(vec![warning(Severity::Moderate, "Bleeding")])),
        ));
        let row = form.add_row();

        form.on_name_input(&row, "warfarin");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            form.row_view(&row).unwrap().tier,
            Some(RowTier::Warning(Severity::Moderate))
        );

        form.on_name_input(&row, "");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(mock.check_count(), 1);
        let view = form.row_view(&row).unwrap();
        assert!(view.is_surface_empty());
        assert_eq!(view.tier, None);
    }

    #[tokio::test(start_paused = true)]
    async fn rows_are_checked_independently() {
        let (mock, form) = live(
            MockSafetyService::new()
                .on_check("warfarin", Ok(CheckOutcome::with_warnings(vec![warning(Severity::High, "w")])))
                .on_check("acetaminophen", Ok(CheckOutcome::safe())),
        );
        let first = form.add_row();
        let second = form.add_row();

        form.on_name_input(&first, "warfarin");
        form.on_name_input(&second, "acetaminophen");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(mock.check_count(), 2);
        assert_eq!(
            form.row_view(&first).unwrap().state(),
            RowUiState::HasWarnings(Severity::High)
        );
        assert_eq!(form.row_view(&second).unwrap().state(), RowUiState::Safe);

        // Each request saw the other row as an existing medication.
        let checks = mock.checks();
        let acetaminophen = checks
            .iter()
            .find(|c| c.medication_name == "acetaminophen")
            .unwrap();
        assert_eq!(acetaminophen.existing_medications[0].name, "warfarin");
    }

    #[tokio::test(start_paused = true)]
    async fn age_change_rechecks_filled_rows() {
        let (mock, form) = live(MockSafetyService::new());
        let row = form.add_row();
        form.add_row();

        form.on_name_input(&row, "zolpidem");
        tokio::time::sleep(Duration::from_secs(1)).await;
        form.on_age_input("90");
        tokio::time::sleep(Duration::from_secs(1)).await;

        let checks = mock.checks();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].age, 65);
        assert_eq!(checks[1].age, 90);
    }

    #[tokio::test(start_paused = true)]
    async fn suggestion_select_flows_into_check() {
        let (mock, form) = live(
            MockSafetyService::new()
                .with_suggestion(Suggestion::new("lorazepam").with_kind("generic"))
                .on_check("lorazepam", Ok(CheckOutcome::with_warnings(vec![warning(Severity::High, "Falls")]))),
        );
        let row = form.add_row();

        form.on_name_input(&row, "lora");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(form.suggestion_panel().is_some());

        assert_eq!(form.select_suggestion(&row, 0).as_deref(), Some("lorazepam"));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The debounced check for "lora" was superseded by the selection.
        assert_eq!(mock.check_count(), 1);
        assert_eq!(mock.checks()[0].medication_name, "lorazepam");
        assert_eq!(
            form.row_view(&row).unwrap().state(),
            RowUiState::HasWarnings(Severity::High)
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(mock.check_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn removing_row_cancels_pending_work() {
        let (mock, form) = live(MockSafetyService::new());
        let row = form.add_row();

        form.on_name_input(&row, "warfarin");
        assert!(form.remove_row(&row));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(mock.check_count(), 0);
        assert!(mock.suggest_queries().is_empty());
        assert!(form.row_view(&row).is_none());
        assert!(form.form_snapshot().rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn prefilled_form_from_markup_fields() {
        let initial = FormState::from_fields([
            ("medication_name[]", "warfarin"),
            ("doses_per_day[]", "1"),
            ("medication_name[]", ""),
            ("doses_per_day[]", ""),
            ("age", "72"),
        ]);
        let mock = Arc::new(MockSafetyService::new());
        let form = LiveForm::with_form(mock.clone(), &ClientConfig::default(), initial);

        form.on_name_input(&RowId::from("row-1"), "aspirin");
        tokio::time::sleep(Duration::from_secs(1)).await;

        let request = &mock.checks()[0];
        assert_eq!(request.medication_name, "aspirin");
        assert_eq!(request.age, 72);
        assert_eq!(request.existing_medications.len(), 1);
    }
}
