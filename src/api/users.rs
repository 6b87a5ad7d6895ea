/// Account administration endpoints
use crate::{
    account::{AccountDetails, Role, UpdateAccountRequest},
    api::{JsonBody, MessageResponse},
    auth::{AuthContext, PsychologistAuth},
    context::AppContext,
    db::models::{Account, PatientView, PsychologistView},
    error::{ClinicError, ClinicResult},
    guards,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/psychologists", get(list_psychologists))
        .route("/patients", get(list_patients))
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    role: Option<String>,
}

/// All accounts, optionally of one role
///
/// A role that no account can hold matches nothing.
async fn list_users(
    State(ctx): State<AppContext>,
    _auth: PsychologistAuth,
    Query(query): Query<UserQuery>,
) -> ClinicResult<Json<Vec<Account>>> {
    let role = match query.role.as_deref().filter(|r| !r.is_empty()) {
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => return Ok(Json(Vec::new())),
        },
        None => None,
    };

    Ok(Json(ctx.account_manager.list_accounts(role).await?))
}

async fn get_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ClinicResult<Json<AccountDetails>> {
    guards::ensure_self(auth.account_id, id)?;

    Ok(Json(ctx.account_manager.account_details(id).await?))
}

async fn update_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateAccountRequest>,
) -> ClinicResult<Json<AccountDetails>> {
    guards::ensure_self(auth.account_id, id)?;

    req.validate()
        .map_err(|e| ClinicError::Validation(format!("Invalid update: {}", e)))?;

    ctx.account_manager.update_account(id, &req).await?;

    Ok(Json(ctx.account_manager.account_details(id).await?))
}

/// Remove the caller's account and everything hanging off it
async fn delete_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ClinicResult<Json<MessageResponse>> {
    guards::ensure_self(auth.account_id, id)?;

    ctx.account_manager.delete_account(id).await?;

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

async fn list_psychologists(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
) -> ClinicResult<Json<Vec<PsychologistView>>> {
    Ok(Json(ctx.account_manager.list_psychologists().await?))
}

async fn list_patients(
    State(ctx): State<AppContext>,
    _auth: PsychologistAuth,
) -> ClinicResult<Json<Vec<PatientView>>> {
    Ok(Json(ctx.account_manager.list_patients().await?))
}
