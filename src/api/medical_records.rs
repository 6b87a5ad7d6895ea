/// Medical record endpoints
use crate::{
    account::Role,
    api::{JsonBody, MessageResponse},
    auth::{Caller, PsychologistAuth},
    context::AppContext,
    db::models::MedicalRecord,
    error::{ClinicError, ClinicResult},
    guards,
    medical_record::{CreateRecordRequest, RecordDetails, RecordQuery, UpdateRecordRequest},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

/// Build medical record routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/medical-records", get(list_records).post(create_record))
        .route(
            "/medical-records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}

async fn with_details(ctx: &AppContext, record: MedicalRecord) -> ClinicResult<RecordDetails> {
    let psychologist = ctx
        .account_manager
        .psychologist_view(record.psychologist_id)
        .await?;
    let patient = ctx.account_manager.patient_view(record.patient_id).await?;

    Ok(RecordDetails {
        record,
        psychologist,
        patient,
    })
}

/// Authored records for psychologists, own records for patients
///
/// The `patientId` filter only applies to psychologists.
async fn list_records(
    State(ctx): State<AppContext>,
    caller: Caller,
    Query(query): Query<RecordQuery>,
) -> ClinicResult<Json<Vec<RecordDetails>>> {
    let records = match caller.role {
        Role::Psychologist => {
            ctx.record_manager
                .list_for_psychologist(caller.profile_id, query.patient_id)
                .await?
        }
        Role::Patient => ctx.record_manager.list_for_patient(caller.profile_id).await?,
    };

    let mut details = Vec::with_capacity(records.len());
    for record in records {
        details.push(with_details(&ctx, record).await?);
    }

    Ok(Json(details))
}

async fn get_record(
    State(ctx): State<AppContext>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ClinicResult<Json<RecordDetails>> {
    let record = guards::owned_or_reject(
        &caller,
        ctx.record_manager.get(id).await?,
        "Medical record",
    )?;

    Ok(Json(with_details(&ctx, record).await?))
}

async fn create_record(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
    JsonBody(req): JsonBody<CreateRecordRequest>,
) -> ClinicResult<(StatusCode, Json<RecordDetails>)> {
    let new = req.into_new_record()?;

    if ctx.account_manager.get_patient(new.patient_id).await?.is_none() {
        return Err(ClinicError::NotFound("Patient not found".to_string()));
    }

    let record = ctx.record_manager.create(caller.profile_id, new).await?;

    Ok((StatusCode::CREATED, Json(with_details(&ctx, record).await?)))
}

/// Author-only edit of content and date
async fn update_record(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateRecordRequest>,
) -> ClinicResult<Json<RecordDetails>> {
    guards::owned_or_reject(&caller, ctx.record_manager.get(id).await?, "Medical record")?;

    req.validate()?;
    let record = ctx.record_manager.update(id, req).await?;

    Ok(Json(with_details(&ctx, record).await?))
}

async fn delete_record(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
    Path(id): Path<i64>,
) -> ClinicResult<Json<MessageResponse>> {
    guards::owned_or_reject(&caller, ctx.record_manager.get(id).await?, "Medical record")?;

    ctx.record_manager.delete(id).await?;

    Ok(Json(MessageResponse::new("Medical record deleted successfully")))
}
