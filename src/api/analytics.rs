/// Practice analytics endpoints, scoped to the calling psychologist
use crate::{
    analytics::{self, AppointmentStats, PatientStats, RecordStats},
    auth::PsychologistAuth,
    context::AppContext,
    error::ClinicResult,
};
use axum::{extract::State, routing::get, Json, Router};
use std::collections::{BTreeSet, HashMap};

/// Build analytics routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/analytics/appointments", get(appointment_stats))
        .route("/analytics/records", get(record_stats))
        .route("/analytics/patients", get(patient_stats))
}

/// Display names for the given patient profiles; unresolvable ids are left out
async fn patient_names(
    ctx: &AppContext,
    patient_ids: impl IntoIterator<Item = i64>,
) -> ClinicResult<HashMap<i64, String>> {
    let mut names = HashMap::new();
    for patient_id in patient_ids.into_iter().collect::<BTreeSet<_>>() {
        if let Some(view) = ctx.account_manager.patient_view(patient_id).await? {
            if let Some(name) = view.display_name() {
                names.insert(patient_id, name.to_string());
            }
        }
    }
    Ok(names)
}

async fn appointment_stats(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
) -> ClinicResult<Json<AppointmentStats>> {
    let appointments = ctx
        .appointment_manager
        .list_for_psychologist(caller.profile_id)
        .await?;

    Ok(Json(analytics::appointment_stats(&appointments)))
}

async fn record_stats(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
) -> ClinicResult<Json<RecordStats>> {
    let records = ctx
        .record_manager
        .list_for_psychologist(caller.profile_id, None)
        .await?;
    let names = patient_names(&ctx, records.iter().map(|r| r.patient_id)).await?;

    Ok(Json(analytics::record_stats(&records, &names)))
}

async fn patient_stats(
    State(ctx): State<AppContext>,
    PsychologistAuth(caller): PsychologistAuth,
) -> ClinicResult<Json<Vec<PatientStats>>> {
    let appointments = ctx
        .appointment_manager
        .list_for_psychologist(caller.profile_id)
        .await?;
    let records = ctx
        .record_manager
        .list_for_psychologist(caller.profile_id, None)
        .await?;
    let names = patient_names(&ctx, appointments.iter().map(|a| a.patient_id)).await?;

    Ok(Json(analytics::patient_stats(&appointments, &records, &names)))
}
