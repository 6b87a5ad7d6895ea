/// Appointment scheduling
///
/// Appointments are booked by a psychologist for one of their patients. The
/// owning psychologist may change any field; the owning patient may only
/// cancel.

mod manager;

pub use manager::AppointmentManager;

use crate::{
    account::Role,
    db::models::{Appointment, PatientView, PsychologistView},
    error::{ClinicError, ClinicResult},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> ClinicResult<Self> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(ClinicError::Validation(format!(
                "Invalid status: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for AppointmentStatus {
    type Error = ClinicError;

    fn try_from(value: String) -> ClinicResult<Self> {
        value.parse()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a `YYYY-MM-DD` date string
pub fn validate_date(date: &str) -> ClinicResult<()> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| ClinicError::Validation(format!("Invalid date: {} (expected YYYY-MM-DD)", date)))
}

/// Check a `HH:MM` time string
pub fn validate_time(time: &str) -> ClinicResult<()> {
    NaiveTime::parse_from_str(time, TIME_FORMAT)
        .map(|_| ())
        .map_err(|_| ClinicError::Validation(format!("Invalid time: {} (expected HH:MM)", time)))
}

/// Appointment creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub patient_id: Option<i64>,
    pub notes: Option<String>,
}

/// Validated appointment creation parameters
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub date: String,
    pub time: String,
    pub patient_id: i64,
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn into_new_appointment(self) -> ClinicResult<NewAppointment> {
        let date = self
            .date
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ClinicError::Validation("Field date is required".to_string()))?;
        let time = self
            .time
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClinicError::Validation("Field time is required".to_string()))?;
        let patient_id = self
            .patient_id
            .ok_or_else(|| ClinicError::Validation("Field patientId is required".to_string()))?;

        validate_date(&date)?;
        validate_time(&time)?;

        Ok(NewAppointment {
            date,
            time,
            patient_id,
            notes: self.notes,
        })
    }
}

/// A present key maps to `Some`, so an explicit `null` becomes `Some(None)`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Appointment update request
///
/// `notes` distinguishes an absent key (`None`) from `"notes": null`
/// (`Some(None)`), which clears the stored notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

/// Validated appointment changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentChanges {
    pub date: Option<String>,
    pub time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<Option<String>>,
}

impl UpdateAppointmentRequest {
    /// Parse and check the requested changes for the caller's role
    ///
    /// Patients may only cancel. Any other patient change is rejected before
    /// the row is touched.
    pub fn into_changes(self, role: Role) -> ClinicResult<AppointmentChanges> {
        if role == Role::Patient {
            let cancels_only = self.date.is_none()
                && self.time.is_none()
                && self.notes.is_none()
                && self.status.as_deref() == Some(AppointmentStatus::Cancelled.as_str());
            if !cancels_only {
                return Err(ClinicError::Authorization(
                    "Patients can only cancel appointments".to_string(),
                ));
            }
        }

        let status: Option<AppointmentStatus> =
            self.status.as_deref().map(str::parse).transpose()?;

        let changes = AppointmentChanges {
            date: self.date,
            time: self.time,
            status,
            notes: self.notes,
        };

        if let Some(date) = &changes.date {
            validate_date(date)?;
        }
        if let Some(time) = &changes.time {
            validate_time(time)?;
        }

        Ok(changes)
    }
}

/// Appointment with the display info of both participants
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub psychologist: Option<PsychologistView>,
    pub patient: Option<PatientView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "cancelled".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Cancelled
        );
        assert_eq!(AppointmentStatus::Completed.to_string(), "completed");
        assert!("cancelado".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_date_and_time_formats() {
        assert!(validate_date("2024-03-15").is_ok());
        assert!(validate_date("15/03/2024").is_err());
        assert!(validate_date("2024-02-30").is_err());
        assert!(validate_time("09:30").is_ok());
        assert!(validate_time("25:00").is_err());
        assert!(validate_time("9h30").is_err());
    }

    #[test]
    fn test_create_request_requires_fields() {
        let req = CreateAppointmentRequest {
            date: Some("2024-03-15".to_string()),
            time: None,
            patient_id: Some(1),
            notes: None,
        };
        match req.into_new_appointment() {
            Err(ClinicError::Validation(msg)) => assert_eq!(msg, "Field time is required"),
            other => panic!("unexpected: {:?}", other),
        }

        let req = CreateAppointmentRequest {
            date: Some("2024-03-15".to_string()),
            time: Some("10:00".to_string()),
            patient_id: Some(1),
            notes: Some("Primeira sessão".to_string()),
        };
        let new = req.into_new_appointment().unwrap();
        assert_eq!(new.patient_id, 1);
    }

    #[test]
    fn test_patient_may_cancel() {
        let req = UpdateAppointmentRequest {
            status: Some("cancelled".to_string()),
            ..Default::default()
        };
        let changes = req.into_changes(Role::Patient).unwrap();
        assert_eq!(changes.status, Some(AppointmentStatus::Cancelled));
    }

    #[test]
    fn test_patient_cannot_confirm() {
        let req = UpdateAppointmentRequest {
            status: Some("confirmed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.into_changes(Role::Patient),
            Err(ClinicError::Authorization(_))
        ));
    }

    #[test]
    fn test_patient_cannot_cancel_and_reschedule() {
        let req = UpdateAppointmentRequest {
            status: Some("cancelled".to_string()),
            date: Some("2024-04-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.into_changes(Role::Patient),
            Err(ClinicError::Authorization(_))
        ));
    }

    #[test]
    fn test_patient_unknown_status_forbidden() {
        let req = UpdateAppointmentRequest {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.into_changes(Role::Patient),
            Err(ClinicError::Authorization(_))
        ));
    }

    #[test]
    fn test_patient_empty_update_forbidden() {
        assert!(matches!(
            UpdateAppointmentRequest::default().into_changes(Role::Patient),
            Err(ClinicError::Authorization(_))
        ));
    }

    #[test]
    fn test_psychologist_may_change_anything() {
        let req = UpdateAppointmentRequest {
            date: Some("2024-04-01".to_string()),
            time: Some("14:00".to_string()),
            status: Some("completed".to_string()),
            notes: Some(Some("Sessão concluída".to_string())),
        };
        let changes = req.into_changes(Role::Psychologist).unwrap();
        assert_eq!(changes.status, Some(AppointmentStatus::Completed));
        assert_eq!(changes.time.as_deref(), Some("14:00"));
    }

    #[test]
    fn test_null_notes_clears() {
        let req: UpdateAppointmentRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        let changes = req.into_changes(Role::Psychologist).unwrap();
        assert_eq!(changes.notes, Some(None));
        assert_ne!(changes, AppointmentChanges::default());

        let req: UpdateAppointmentRequest = serde_json::from_str(r#"{"status": "confirmed"}"#).unwrap();
        assert_eq!(req.into_changes(Role::Psychologist).unwrap().notes, None);

        let req: UpdateAppointmentRequest =
            serde_json::from_str(r#"{"notes": "Retorno em 15 dias"}"#).unwrap();
        assert_eq!(
            req.into_changes(Role::Psychologist).unwrap().notes,
            Some(Some("Retorno em 15 dias".to_string()))
        );
    }

    #[test]
    fn test_patient_null_notes_forbidden() {
        let req: UpdateAppointmentRequest =
            serde_json::from_str(r#"{"status": "cancelled", "notes": null}"#).unwrap();
        assert!(matches!(
            req.into_changes(Role::Patient),
            Err(ClinicError::Authorization(_))
        ));
    }

    #[test]
    fn test_psychologist_invalid_status_rejected() {
        let req = UpdateAppointmentRequest {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.into_changes(Role::Psychologist),
            Err(ClinicError::Validation(_))
        ));
    }
}
