//! Form state and the medication snapshot reader.
//!
//! `FormState` mirrors what the clinician has typed: ordered medication rows
//! (raw strings, exactly as entered) and the patient age field. Reading a
//! snapshot never fails; bad numbers degrade to defaults.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::{DEFAULT_AGE, DEFAULT_DOSES_PER_DAY};
use crate::models::{MedicationContext, MedicationEntry, PatientContext, RowId};

/// Field name prefixes of the medication row inputs.
pub const NAME_FIELD_PREFIX: &str = "medication_name";
pub const DOSES_FIELD_PREFIX: &str = "doses_per_day";
/// Name (or id) of the patient age input.
pub const AGE_FIELD: &str = "age";

/// One medication row, raw input values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormRow {
    pub id: RowId,
    pub name: String,
    pub doses_per_day: String,
}

impl FormRow {
    fn empty(id: RowId) -> Self {
        Self {
            id,
            name: String::new(),
            doses_per_day: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    rows: Vec<FormRow>,
    age: Option<String>,
}

/// Form state shared by the check and suggestion pipelines.
pub type SharedForm = Arc<Mutex<FormState>>;

pub fn shared(form: FormState) -> SharedForm {
    Arc::new(Mutex::new(form))
}

pub(crate) fn lock_form(form: &SharedForm) -> MutexGuard<'_, FormState> {
    form.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build rows from `(field name, value)` pairs in document order.
    ///
    /// The i-th `medication_name*` field and the i-th `doses_per_day*` field
    /// belong to row i (`row-<i>`). A field named `age` sets the age.
    /// Anything else is ignored.
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut form = Self::new();
        let mut names = 0usize;
        let mut doses = 0usize;

        for (field, value) in fields {
            if field.starts_with(NAME_FIELD_PREFIX) {
                form.row_at(names).name = value.to_string();
                names += 1;
            } else if field.starts_with(DOSES_FIELD_PREFIX) {
                form.row_at(doses).doses_per_day = value.to_string();
                doses += 1;
            } else if field == AGE_FIELD {
                form.age = Some(value.to_string());
            }
        }

        form
    }

    fn row_at(&mut self, index: usize) -> &mut FormRow {
        while self.rows.len() <= index {
            let id = RowId::new(format!("row-{}", self.rows.len()));
            self.rows.push(FormRow::empty(id));
        }
        &mut self.rows[index]
    }

    // ── Row lifecycle ────────────────────────────────────

    /// Append an empty row with a generated id.
    pub fn add_row(&mut self) -> RowId {
        let id = RowId::generate();
        self.rows.push(FormRow::empty(id.clone()));
        id
    }

    /// Append an empty row with a caller-chosen id. Returns false if the id
    /// is already taken.
    pub fn add_row_with_id(&mut self, id: RowId) -> bool {
        if self.row(&id).is_some() {
            return false;
        }
        self.rows.push(FormRow::empty(id));
        true
    }

    pub fn remove_row(&mut self, id: &RowId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| &row.id != id);
        self.rows.len() != before
    }

    // ── Field edits ──────────────────────────────────────

    pub fn set_name(&mut self, id: &RowId, value: &str) -> bool {
        match self.row_mut(id) {
            Some(row) => {
                row.name = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_doses(&mut self, id: &RowId, value: &str) -> bool {
        match self.row_mut(id) {
            Some(row) => {
                row.doses_per_day = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_age(&mut self, value: &str) {
        self.age = Some(value.to_string());
    }

    // ── Reads ────────────────────────────────────────────

    pub fn rows(&self) -> &[FormRow] {
        &self.rows
    }

    pub fn row(&self, id: &RowId) -> Option<&FormRow> {
        self.rows.iter().find(|row| &row.id == id)
    }

    fn row_mut(&mut self, id: &RowId) -> Option<&mut FormRow> {
        self.rows.iter_mut().find(|row| &row.id == id)
    }

    /// Raw name value of a row.
    pub fn name(&self, id: &RowId) -> Option<&str> {
        self.row(id).map(|row| row.name.as_str())
    }

    pub fn patient(&self) -> PatientContext {
        PatientContext {
            age: parse_age(self.age.as_deref()),
        }
    }

    /// Snapshot the sibling medications and patient attributes for a check
    /// of `excluding`.
    ///
    /// Names are trimmed, empty rows skipped, and every row whose name
    /// matches `excluding` case-insensitively is left out so a medication
    /// is never checked against itself.
    pub fn read_context(&self, excluding: &str) -> MedicationContext {
        let excluded = excluding.trim().to_lowercase();

        let existing_medications = self
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.name.trim();
                if name.is_empty() || name.to_lowercase() == excluded {
                    return None;
                }
                Some(MedicationEntry {
                    name: name.to_string(),
                    doses_per_day: parse_doses(&row.doses_per_day),
                })
            })
            .collect();

        MedicationContext {
            existing_medications,
            patient: self.patient(),
        }
    }
}

fn parse_doses(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(doses) if doses >= 1 => doses,
        _ => DEFAULT_DOSES_PER_DAY,
    }
}

fn parse_age(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_AGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(rows: &[(&str, &str)]) -> (FormState, Vec<RowId>) {
        let mut form = FormState::new();
        let ids = rows
            .iter()
            .map(|(name, doses)| {
                let id = form.add_row();
                form.set_name(&id, name);
                form.set_doses(&id, doses);
                id
            })
            .collect();
        (form, ids)
    }

    #[test]
    fn excludes_edited_name_case_insensitively() {
        let (form, _) = form_with(&[("Warfarin", "1"), ("aspirin", "2"), ("  WARFARIN ", "3")]);
        let context = form.read_context(" warfarin");
        assert_eq!(
            context.existing_medications,
            vec![MedicationEntry {
                name: "aspirin".into(),
                doses_per_day: 2
            }]
        );
    }

    #[test]
    fn drops_empty_rows_and_trims() {
        let (form, _) = form_with(&[("", "1"), ("   ", "2"), ("  metformin  ", "2")]);
        let context = form.read_context("lisinopril");
        assert_eq!(context.existing_medications.len(), 1);
        assert_eq!(context.existing_medications[0].name, "metformin");
    }

    #[test]
    fn bad_doses_fall_back_to_one() {
        let (form, _) = form_with(&[("a", ""), ("b", "twice"), ("c", "0"), ("d", "-2"), ("e", " 3 ")]);
        let doses: Vec<u32> = form
            .read_context("zzz")
            .existing_medications
            .iter()
            .map(|m| m.doses_per_day)
            .collect();
        assert_eq!(doses, vec![1, 1, 1, 1, 3]);
    }

    #[test]
    fn age_defaults_to_65() {
        let mut form = FormState::new();
        assert_eq!(form.patient().age, 65);
        form.set_age("eighty");
        assert_eq!(form.patient().age, 65);
        form.set_age(" 82 ");
        assert_eq!(form.read_context("x").patient.age, 82);
    }

    #[test]
    fn from_fields_pairs_rows_in_order() {
        let form = FormState::from_fields([
            ("age", "77"),
            ("medication_name[]", "warfarin"),
            ("doses_per_day[]", "1"),
            ("medication_name[]", "diphenhydramine"),
            ("doses_per_day[]", "3"),
            ("notes", "ignored"),
        ]);

        assert_eq!(form.rows().len(), 2);
        assert_eq!(form.rows()[1].id, RowId::from("row-1"));
        assert_eq!(form.name(&RowId::from("row-1")), Some("diphenhydramine"));
        assert_eq!(form.patient().age, 77);

        let context = form.read_context("aspirin");
        assert_eq!(context.existing_medications[1].doses_per_day, 3);
    }

    #[test]
    fn from_fields_tolerates_missing_doses() {
        let form = FormState::from_fields([("medication_name_0", "a"), ("medication_name_1", "b")]);
        assert_eq!(form.rows().len(), 2);
        assert_eq!(form.read_context("a").existing_medications[0].doses_per_day, 1);
    }

    #[test]
    fn row_lifecycle() {
        let mut form = FormState::new();
        let id = RowId::from("fixed");
        assert!(form.add_row_with_id(id.clone()));
        assert!(!form.add_row_with_id(id.clone()));
        assert!(form.set_name(&id, "aspirin"));
        assert!(form.remove_row(&id));
        assert!(!form.remove_row(&id));
        assert!(!form.set_name(&id, "aspirin"));
        assert!(form.name(&id).is_none());
    }
}
