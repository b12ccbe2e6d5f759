use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity tier of a safety warning. Ordering is ascending:
/// `Low < Moderate < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }

    /// Badge text shown next to the warning title.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
        }
    }
}

// ---------------------------------------------------------------------------
// Warning
// ---------------------------------------------------------------------------

/// A warning produced by the rules service. The client orders and renders
/// these; it never edits their content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub severity: Severity,
    #[serde(default)]
    pub icon: String,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Body returned by `POST /api/check-medication`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckResponse {
    pub success: bool,
    /// Absent means "not known to be safe", which lands on the no-match path.
    #[serde(default)]
    pub safe: bool,
    pub warnings: Vec<Warning>,
}

/// Evaluation of one medication, after the transport envelope is stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub safe: bool,
    pub warnings: Vec<Warning>,
}

impl CheckOutcome {
    pub fn safe() -> Self {
        Self {
            safe: true,
            warnings: Vec::new(),
        }
    }

    /// No warnings and not flagged safe: the service did not recognise the name.
    pub fn no_match() -> Self {
        Self {
            safe: false,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(warnings: Vec<Warning>) -> Self {
        Self {
            safe: false,
            warnings,
        }
    }
}
