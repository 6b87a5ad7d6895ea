/// Appointment endpoints
use crate::{
    account::Role,
    api::{JsonBody, MessageResponse},
    appointment::{AppointmentDetails, CreateAppointmentRequest, UpdateAppointmentRequest},
    auth::{Caller, PsychologistAuth},
    context::AppContext,
    db::models::Appointment,
    error::{ClinicError, ClinicResult},
    guards,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

/// Build appointment routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/appointments/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
}

/// Attach psychologist and patient display info
async fn with_details(ctx: &AppContext, appointment: Appointment) -> ClinicResult<AppointmentDetails> {
    let psychologist = ctx
        .account_manager
        .psychologist_view(appointment.psychologist_id)
        .await?;
    let patient = ctx.account_manager.patient_view(appointment.patient_id).await?;

    Ok(AppointmentDetails {
        appointment,
        psychologist,
        patient,
    })
}

/// Caller's own appointments
async fn list_appointments(
    State(ctx): State<AppContext>,
    caller: Caller,
) -> ClinicResult<Json<Vec<AppointmentDetails>>> {
    let appointments = match caller.role {
        Role::Psychologist => {
            ctx.appointment_manager
                .list_for_psychologist(caller.profile_id)
                .await?
        }
        Role::Patient => ctx.appointment_manager.list_for_patient(caller.profile_id).await?,
    };

    let mut details = Vec::with_capacity(appointments.len());
    for appointment in appointments {
        details.push(with_details(&ctx, appointment).await?);
    }

    Ok(Json(details))
}

async fn get_appointment(
    State(ctx): State<AppContext>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ClinicResult<Json<AppointmentDetails>> {
    let appointment = guards::owned_or_reject(
        &caller,
        ctx.appointment_manager.get(id).await?,
        "Appointment",
    )?;

    Ok(Json(with_details(&ctx, appointment).await?))
}

/// Book an appointment for one of the psychologist's patients
async fn create_appointment(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
    JsonBody(req): JsonBody<CreateAppointmentRequest>,
) -> ClinicResult<(StatusCode, Json<AppointmentDetails>)> {
    let new = req.into_new_appointment()?;

    if ctx.account_manager.get_patient(new.patient_id).await?.is_none() {
        return Err(ClinicError::NotFound("Patient not found".to_string()));
    }

    let appointment = ctx.appointment_manager.create(caller.profile_id, new).await?;

    Ok((StatusCode::CREATED, Json(with_details(&ctx, appointment).await?)))
}

/// Owning psychologist edits freely; owning patient may only cancel
async fn update_appointment(
    State(ctx): State<AppContext>,
    caller: Caller,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateAppointmentRequest>,
) -> ClinicResult<Json<AppointmentDetails>> {
    guards::owned_or_reject(
        &caller,
        ctx.appointment_manager.get(id).await?,
        "Appointment",
    )?;

    let changes = req.into_changes(caller.role)?;
    let appointment = ctx.appointment_manager.update(id, changes).await?;

    Ok(Json(with_details(&ctx, appointment).await?))
}

async fn delete_appointment(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
    Path(id): Path<i64>,
) -> ClinicResult<Json<MessageResponse>> {
    guards::owned_or_reject(
        &caller,
        ctx.appointment_manager.get(id).await?,
        "Appointment",
    )?;

    ctx.appointment_manager.delete(id).await?;

    Ok(Json(MessageResponse::new("Appointment deleted successfully")))
}
