/// Database row types
use crate::{account::Role, appointment::AppointmentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub login_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Psychologist profile, 1:1 with a psychologist account
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychologistProfile {
    pub id: i64,
    pub account_id: i64,
    pub license_number: String,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patient profile, 1:1 with a patient account
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: i64,
    pub account_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Appointment record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub date: String,
    pub time: String,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub psychologist_id: i64,
    pub patient_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Medical record authored by a psychologist about a patient
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: i64,
    pub date: String,
    pub content: String,
    pub patient_id: i64,
    pub psychologist_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Psychologist profile together with its account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychologistView {
    #[serde(flatten)]
    pub profile: PsychologistProfile,
    pub account: Option<Account>,
}

/// Patient profile together with its account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientView {
    #[serde(flatten)]
    pub profile: PatientProfile,
    pub account: Option<Account>,
}

impl PatientView {
    /// Display name of the patient, if the account still exists
    pub fn display_name(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.display_name.as_str())
    }
}
