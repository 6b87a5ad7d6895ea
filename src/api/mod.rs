/// API routes and handlers
pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod health;
pub mod medical_records;
pub mod middleware;
pub mod users;

use crate::{context::AppContext, error::ClinicError};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Build API routes
///
/// Everything lives under `/api`; the health check is also served at the root.
pub fn routes() -> Router<AppContext> {
    let api = Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(appointments::routes())
        .merge(medical_records::routes())
        .merge(analytics::routes())
        .merge(health::routes());

    Router::new().nest("/api", api).merge(health::routes())
}

/// Plain confirmation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// JSON body whose rejections render as a clinic validation error
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ClinicError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ClinicError::Validation(e.body_text()))?;

        Ok(JsonBody(value))
    }
}
