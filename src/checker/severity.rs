//! Severity ranking for warning lists.

use crate::models::{Severity, Warning};

/// Sort warnings most severe first. Stable: warnings of equal severity keep
/// the order the service sent them in.
pub fn sort_by_severity(warnings: &mut [Warning]) {
    warnings.sort_by(|a, b| b.severity.cmp(&a.severity));
}

/// The single tier used for row styling: the highest severity present.
pub fn highest_severity(warnings: &[Warning]) -> Option<Severity> {
    warnings.iter().map(|w| w.severity).max()
}
