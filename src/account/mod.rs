/// Account management system
///
/// Handles registration, credential checks, profile lookup and the
/// self-service account endpoints.

mod manager;

pub use manager::AccountManager;

use crate::{
    db::models::{Account, PatientProfile, PsychologistProfile},
    error::{ClinicError, ClinicResult},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Account role. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Psychologist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Psychologist => "psychologist",
        }
    }
}

impl FromStr for Role {
    type Err = ClinicError;

    fn from_str(s: &str) -> ClinicResult<Self> {
        match s {
            "patient" => Ok(Role::Patient),
            "psychologist" => Ok(Role::Psychologist),
            _ => Err(ClinicError::Validation(
                "Invalid role. Must be \"patient\" or \"psychologist\"".to_string(),
            )),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ClinicError;

    fn try_from(value: String) -> ClinicResult<Self> {
        value.parse()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub account_id: i64,
    pub display_name: String,
}

/// Registration request
///
/// Every field is optional at the wire level so a missing field is reported
/// by name instead of as a generic body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub license_number: Option<String>,
    pub specialty: Option<String>,
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub id: i64,
}

/// Validated account creation parameters
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub login_name: String,
    pub password: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub license_number: Option<String>,
    pub specialty: Option<String>,
}

impl RegisterRequest {
    /// Check required fields and formats, producing creation parameters
    pub fn into_new_account(self) -> ClinicResult<NewAccount> {
        let required = [
            ("loginName", &self.login_name),
            ("password", &self.password),
            ("email", &self.email),
            ("displayName", &self.display_name),
            ("phone", &self.phone),
            ("role", &self.role),
        ];
        for (name, value) in required {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ClinicError::Validation(format!("Field {} is required", name)));
            }
        }

        let role: Role = self.role.as_deref().unwrap_or_default().parse()?;

        self.validate()
            .map_err(|e| ClinicError::Validation(format!("Invalid registration: {}", e)))?;

        let license_number = self.license_number.filter(|v| !v.trim().is_empty());
        if role == Role::Psychologist && license_number.is_none() {
            return Err(ClinicError::Validation(
                "licenseNumber is required for psychologists".to_string(),
            ));
        }

        Ok(NewAccount {
            login_name: self.login_name.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            display_name: self.display_name.unwrap_or_default(),
            phone: self.phone,
            role,
            license_number,
            specialty: self.specialty,
        })
    }
}

/// Self-service account update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub display_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub license_number: Option<String>,
    pub specialty: Option<String>,
}

/// Account with its role profile, as returned by the profile endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    #[serde(flatten)]
    pub account: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psychologist: Option<PsychologistProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient_request() -> RegisterRequest {
        RegisterRequest {
            login_name: Some("maria.oliveira".to_string()),
            password: Some("senha456".to_string()),
            email: Some("maria@example.com".to_string()),
            display_name: Some("Maria Oliveira".to_string()),
            phone: Some("(11) 91234-5678".to_string()),
            role: Some("patient".to_string()),
            license_number: None,
            specialty: None,
        }
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("patient".parse::<Role>().unwrap(), Role::Patient);
        assert_eq!("psychologist".parse::<Role>().unwrap(), Role::Psychologist);
        assert_eq!(Role::Psychologist.to_string(), "psychologist");
        assert!("admin".parse::<Role>().is_err());
        assert!("Patient".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Patient).unwrap(), "\"patient\"");
    }

    #[test]
    fn test_register_request_valid_patient() {
        let account = patient_request().into_new_account().unwrap();
        assert_eq!(account.role, Role::Patient);
        assert_eq!(account.login_name, "maria.oliveira");
        assert!(account.license_number.is_none());
    }

    #[test]
    fn test_register_request_missing_field() {
        let mut req = patient_request();
        req.phone = None;
        match req.into_new_account() {
            Err(ClinicError::Validation(msg)) => assert_eq!(msg, "Field phone is required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_register_request_blank_field_counts_as_missing() {
        let mut req = patient_request();
        req.login_name = Some("   ".to_string());
        assert!(matches!(req.into_new_account(), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn test_register_request_invalid_role() {
        let mut req = patient_request();
        req.role = Some("admin".to_string());
        assert!(matches!(req.into_new_account(), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn test_register_request_invalid_email() {
        let mut req = patient_request();
        req.email = Some("not-an-email".to_string());
        assert!(matches!(req.into_new_account(), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn test_psychologist_requires_license() {
        let mut req = patient_request();
        req.role = Some("psychologist".to_string());
        assert!(matches!(req.clone().into_new_account(), Err(ClinicError::Validation(_))));

        req.license_number = Some("CRP 12345".to_string());
        let account = req.into_new_account().unwrap();
        assert_eq!(account.license_number.as_deref(), Some("CRP 12345"));
        assert!(account.specialty.is_none());
    }

    #[test]
    fn test_update_request_email_validation() {
        let req = UpdateAccountRequest {
            email: Some("broken".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = UpdateAccountRequest {
            display_name: Some("New Name".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }
}
