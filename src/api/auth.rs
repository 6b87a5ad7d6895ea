/// Login, registration and profile endpoints
use crate::{
    account::{AccountDetails, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    api::JsonBody,
    auth::AuthContext,
    context::AppContext,
    error::{ClinicError, ClinicResult},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/profile", get(profile))
}

/// Exchange credentials for a session token
async fn login(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ClinicResult<Json<LoginResponse>> {
    let (login_name, password) = match (req.login_name, req.password) {
        (Some(login_name), Some(password)) if !login_name.is_empty() && !password.is_empty() => {
            (login_name, password)
        }
        _ => {
            return Err(ClinicError::Validation(
                "Login name and password are required".to_string(),
            ))
        }
    };

    let account = ctx.account_manager.login(&login_name, &password).await?;
    let token = ctx
        .tokens
        .issue(account.id, account.role, ctx.tokens.ttl())?;

    tracing::info!(account_id = account.id, role = %account.role, "Login successful");

    Ok(Json(LoginResponse {
        token,
        role: account.role,
        account_id: account.id,
        display_name: account.display_name,
    }))
}

/// Create an account with its role profile
async fn register(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ClinicResult<(StatusCode, Json<RegisterResponse>)> {
    let new = req.into_new_account()?;
    let account = ctx.account_manager.create_account(new).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            id: account.id,
        }),
    ))
}

/// Caller's own account
async fn profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ClinicResult<Json<AccountDetails>> {
    let details = ctx
        .account_manager
        .account_details(auth.account_id)
        .await
        .map_err(|e| match e {
            ClinicError::NotFound(_) => ClinicError::NotFound("User not found".to_string()),
            other => other,
        })?;

    Ok(Json(details))
}
