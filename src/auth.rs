/// Authentication extractors
use crate::{
    account::Role,
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::ClinicError,
    guards,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - verifies the bearer token
///
/// Only the token is checked; the account may have been deleted since it was
/// issued, in which case handlers that load it answer 404.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub account_id: i64,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ClinicError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ClinicError::Authentication("Missing authorization header".to_string()))?;

        let verified = state.tokens.verify(&token)?;

        Ok(AuthContext {
            account_id: verified.account_id,
            role: verified.role,
        })
    }
}

/// Authenticated caller with the profile matching their role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub account_id: i64,
    pub role: Role,
    pub profile_id: i64,
}

#[async_trait]
impl FromRequestParts<AppContext> for Caller {
    type Rejection = ClinicError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        resolve_caller(state, auth).await
    }
}

/// Psychologist-only context
///
/// Role is checked from the token before any lookup, so a patient gets 403
/// even when their profile is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsychologistAuth(pub Caller);

#[async_trait]
impl FromRequestParts<AppContext> for PsychologistAuth {
    type Rejection = ClinicError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        guards::ensure_role(auth.role, Role::Psychologist)?;

        Ok(PsychologistAuth(resolve_caller(state, auth).await?))
    }
}

async fn resolve_caller(state: &AppContext, auth: AuthContext) -> Result<Caller, ClinicError> {
    let profile_id = state
        .account_manager
        .profile_id(auth.account_id, auth.role)
        .await?
        .ok_or_else(|| match auth.role {
            Role::Psychologist => ClinicError::NotFound("Psychologist not found".to_string()),
            Role::Patient => ClinicError::NotFound("Patient not found".to_string()),
        })?;

    Ok(Caller {
        account_id: auth.account_id,
        role: auth.role,
        profile_id,
    })
}
