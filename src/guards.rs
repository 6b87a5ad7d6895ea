/// Role and ownership checks shared by the handlers
use crate::{
    account::Role,
    auth::Caller,
    db::models::{Appointment, MedicalRecord},
    error::{ClinicError, ClinicResult},
};

/// A resource owned by one psychologist and one patient
pub trait Owned {
    fn psychologist_id(&self) -> i64;
    fn patient_id(&self) -> i64;
}

impl Owned for Appointment {
    fn psychologist_id(&self) -> i64 {
        self.psychologist_id
    }

    fn patient_id(&self) -> i64 {
        self.patient_id
    }
}

impl Owned for MedicalRecord {
    fn psychologist_id(&self) -> i64 {
        self.psychologist_id
    }

    fn patient_id(&self) -> i64 {
        self.patient_id
    }
}

/// Reject callers whose role is not `required`
pub fn ensure_role(actual: Role, required: Role) -> ClinicResult<()> {
    if actual != required {
        tracing::debug!(%actual, %required, "Role check failed");
        return Err(ClinicError::Authorization(match required {
            Role::Psychologist => "Access restricted to psychologists".to_string(),
            Role::Patient => "Access restricted to patients".to_string(),
        }));
    }
    Ok(())
}

/// Check the caller is the psychologist or patient side of `resource`
pub fn ensure_owner<R: Owned>(caller: &Caller, resource: &R) -> ClinicResult<()> {
    let owner = match caller.role {
        Role::Psychologist => resource.psychologist_id(),
        Role::Patient => resource.patient_id(),
    };

    if owner != caller.profile_id {
        tracing::debug!(
            account_id = caller.account_id,
            profile_id = caller.profile_id,
            owner,
            "Ownership check failed"
        );
        return Err(ClinicError::Authorization(
            "Not allowed to access this resource".to_string(),
        ));
    }
    Ok(())
}

/// Resolve an optional lookup, then check ownership
///
/// Missing resources are reported before ownership so a 404 wins over a 403.
pub fn owned_or_reject<R: Owned>(caller: &Caller, resource: Option<R>, what: &str) -> ClinicResult<R> {
    let resource = resource.ok_or_else(|| ClinicError::NotFound(format!("{} not found", what)))?;
    ensure_owner(caller, &resource)?;
    Ok(resource)
}

/// Self-service check on `/users/{id}`
pub fn ensure_self(caller_account_id: i64, target_account_id: i64) -> ClinicResult<()> {
    if caller_account_id != target_account_id {
        tracing::debug!(caller_account_id, target_account_id, "Self check failed");
        return Err(ClinicError::Authorization(
            "Not allowed to access another account".to_string(),
        ));
    }
    Ok(())
}
