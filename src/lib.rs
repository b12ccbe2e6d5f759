//! Real-time medication safety validation for clinical entry forms.
//!
//! As medication rows are typed, each row is checked against a rules
//! service after a quiet period; stale responses are suppressed per row and
//! the newest result is projected into severity-ranked warnings and row
//! styling. A companion pipeline serves drug name suggestions.

pub mod checker;
pub mod config;
pub mod debounce;
pub mod form;
pub mod live_form;
pub mod models;
pub mod render;
pub mod service;
pub mod suggest;

pub use checker::{ApplyOutcome, CheckResult, RowTier, RowUiState, RowView, Validator, WarningSurface};
pub use debounce::Debouncer;
pub use form::FormState;
pub use live_form::LiveForm;
pub use service::{HttpSafetyService, MockSafetyService, SafetyService, ServiceError};
pub use suggest::{ClickTarget, SuggestionPanel, SuggestionPipeline};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, filtered by `RUST_LOG` or
/// [`config::default_log_filter`]. A second call is a no-op.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
