//! HTML fragments for the warning surface and the suggestion panel.
//!
//! Service text is always escaped; the service decides what a warning says,
//! never what markup it produces.

use crate::checker::{RowTier, RowView, WarningSurface};
use crate::models::{Severity, Warning};
use crate::suggest::SuggestionPanel;

pub const LOADING_TEXT: &str = "Checking medication safety...";
pub const SAFE_TEXT: &str = "No safety concerns found";

impl Severity {
    /// CSS modifier used on warning blocks and badges.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Low => "severity-low",
            Self::Moderate => "severity-moderate",
            Self::High => "severity-high",
        }
    }
}

impl RowTier {
    /// Class applied to the medication row container.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Safe => "row-safe",
            Self::Warning(Severity::High) => "row-warning-high",
            Self::Warning(Severity::Moderate) => "row-warning-moderate",
            Self::Warning(Severity::Low) => "row-warning-low",
        }
    }
}

/// Row class for a view, if any styling applies.
pub fn row_class(view: &RowView) -> Option<&'static str> {
    view.tier.map(|tier| tier.css_class())
}

/// Inner HTML of a row's warning area. Empty string means "hide it".
pub fn surface_html(view: &RowView) -> String {
    match &view.surface {
        WarningSurface::Hidden => String::new(),
        WarningSurface::Loading => {
            format!("<div class=\"warning-loading\">{LOADING_TEXT}</div>")
        }
        WarningSurface::SafeNotice => {
            format!("<div class=\"warning-safe\">&#10003; {SAFE_TEXT}</div>")
        }
        WarningSurface::Unavailable { message } => {
            format!("<div class=\"warning-unavailable\">{}</div>", escape(message))
        }
        WarningSurface::Warnings { warnings } => warnings.iter().map(warning_block).collect(),
    }
}

fn warning_block(warning: &Warning) -> String {
    let severity = warning.severity;
    let mut html = format!(
        "<div class=\"warning-item {class}\">\
         <div class=\"warning-header\">\
         <span class=\"warning-icon\">{icon}</span>\
         <span class=\"warning-title\">{title}</span>\
         <span class=\"severity-badge {class}\">{badge}</span>\
         </div>\
         <div class=\"warning-message\">{message}</div>",
        class = severity.css_class(),
        icon = escape(&warning.icon),
        title = escape(&warning.title),
        badge = severity.label(),
        message = escape(&warning.message),
    );

    if let Some(recommendation) = &warning.recommendation {
        html.push_str(&format!(
            "<div class=\"warning-recommendation\"><strong>Recommendation:</strong> {}</div>",
            escape(recommendation)
        ));
    }
    if let Some(category) = &warning.category {
        html.push_str(&format!(
            "<div class=\"warning-category\">{}</div>",
            escape(category)
        ));
    }

    html.push_str("</div>");
    html
}

/// Candidate list for an open suggestion panel.
pub fn suggestions_html(panel: &SuggestionPanel) -> String {
    let mut html = String::from("<ul class=\"suggestion-list\">");
    for (index, suggestion) in panel.candidates.iter().enumerate() {
        html.push_str(&format!(
            "<li class=\"suggestion-item\" data-index=\"{index}\">\
             <span class=\"suggestion-name\">{}</span>",
            escape(&suggestion.name)
        ));
        if let Some(kind) = &suggestion.kind {
            html.push_str(&format!("<span class=\"suggestion-type\">{}</span>", escape(kind)));
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
