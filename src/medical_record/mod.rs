/// Medical records
///
/// Written by a psychologist about one of their patients. Only the author may
/// change or remove a record; the subject patient may read it.

mod manager;

pub use manager::RecordManager;

use crate::{
    appointment::validate_date,
    db::models::{MedicalRecord, PatientView, PsychologistView},
    error::{ClinicError, ClinicResult},
};
use serde::{Deserialize, Serialize};

/// Record creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub date: Option<String>,
    pub content: Option<String>,
    pub patient_id: Option<i64>,
}

/// Validated record creation parameters
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub date: String,
    pub content: String,
    pub patient_id: i64,
}

impl CreateRecordRequest {
    pub fn into_new_record(self) -> ClinicResult<NewRecord> {
        let date = self
            .date
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ClinicError::Validation("Field date is required".to_string()))?;
        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ClinicError::Validation("Field content is required".to_string()))?;
        let patient_id = self
            .patient_id
            .ok_or_else(|| ClinicError::Validation("Field patientId is required".to_string()))?;

        validate_date(&date)?;

        Ok(NewRecord {
            date,
            content,
            patient_id,
        })
    }
}

/// Record update request; only content and date are mutable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    pub date: Option<String>,
    pub content: Option<String>,
}

impl UpdateRecordRequest {
    pub fn validate(&self) -> ClinicResult<()> {
        if let Some(date) = &self.date {
            validate_date(date)?;
        }
        if self.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ClinicError::Validation("content must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Query parameters for listing records
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub patient_id: Option<i64>,
}

/// Record with the display info of author and subject
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetails {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub psychologist: Option<PsychologistView>,
    pub patient: Option<PatientView>,
}
