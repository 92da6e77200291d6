//! Column naming for the encounter dataset and the derived feature table.

use serde::{Deserialize, Serialize};

/// Derived age at ICU admission, in whole years.
pub const AGE: &str = "age";
/// Derived ICU stay length, in whole hours.
pub const ICU_STAY_DURATION: &str = "icu_stay_duration";
/// Derived hospital stay length, in whole hours.
pub const HOSP_STAY_DURATION: &str = "hosp_stay_duration";

/// Names of the input columns the pipeline depends on.
///
/// Defaults follow the MIMIC-III first-24-hour demographics extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    pub encounter_id: String,
    pub subject_id: String,
    pub date_of_birth: String,
    pub admit_time: String,
    pub discharge_time: String,
    pub icu_in_time: String,
    pub icu_out_time: String,
    pub diagnosis_code: String,
    pub outcome: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            encounter_id: "icustay_id".to_string(),
            subject_id: "subject_id".to_string(),
            date_of_birth: "dob".to_string(),
            admit_time: "admittime".to_string(),
            discharge_time: "dischtime".to_string(),
            icu_in_time: "intime".to_string(),
            icu_out_time: "outtime".to_string(),
            diagnosis_code: "icd9_code".to_string(),
            outcome: "hospital_expire_flag".to_string(),
        }
    }
}

impl ColumnNames {
    /// Every column that must be present in the input dataset.
    pub fn required(&self) -> Vec<&str> {
        vec![
            self.encounter_id.as_str(),
            self.subject_id.as_str(),
            self.date_of_birth.as_str(),
            self.admit_time.as_str(),
            self.discharge_time.as_str(),
            self.icu_in_time.as_str(),
            self.icu_out_time.as_str(),
            self.diagnosis_code.as_str(),
            self.outcome.as_str(),
        ]
    }

    /// Timestamp columns, consumed by derivation and never used as features.
    pub fn timestamps(&self) -> [&str; 5] {
        [
            self.date_of_birth.as_str(),
            self.admit_time.as_str(),
            self.discharge_time.as_str(),
            self.icu_in_time.as_str(),
            self.icu_out_time.as_str(),
        ]
    }
}
