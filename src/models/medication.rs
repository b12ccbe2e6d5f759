use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one medication row in the form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for a row added at runtime.
    pub fn generate() -> Self {
        Self(format!("row-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Per-row request counter. Only the highest generation issued for a row
/// may paint that row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// One entered medication, as sent to the rules service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub name: String,
    pub doses_per_day: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    pub age: u32,
}

/// Everything the rules service needs besides the name being checked,
/// captured from the form at the moment a check fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationContext {
    pub existing_medications: Vec<MedicationEntry>,
    pub patient: PatientContext,
}

/// Body of `POST /api/check-medication`.
///
/// The generation never leaves the client; it only tags the request so the
/// response can be matched against the row's newest check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub medication_name: String,
    pub existing_medications: Vec<MedicationEntry>,
    pub age: u32,
    #[serde(skip)]
    pub generation: Generation,
}

impl CheckRequest {
    pub fn new(medication_name: impl Into<String>, context: MedicationContext, generation: Generation) -> Self {
        Self {
            medication_name: medication_name.into(),
            existing_medications: context.existing_medications,
            age: context.patient.age,
            generation,
        }
    }
}
