/// Demo data for a fresh database
use crate::{
    account::{NewAccount, Role},
    appointment::NewAppointment,
    context::AppContext,
    error::{ClinicError, ClinicResult},
    medical_record::NewRecord,
};

fn demo_account(
    login_name: &str,
    password: &str,
    email: &str,
    display_name: &str,
    phone: &str,
    role: Role,
) -> NewAccount {
    NewAccount {
        login_name: login_name.to_string(),
        password: password.to_string(),
        email: email.to_string(),
        display_name: display_name.to_string(),
        phone: Some(phone.to_string()),
        role,
        license_number: None,
        specialty: None,
    }
}

/// Insert one psychologist, two patients and some sample history
///
/// Does nothing unless the account table is empty. Returns whether data was
/// inserted.
pub async fn seed_demo(ctx: &AppContext) -> ClinicResult<bool> {
    if ctx.account_manager.count_accounts().await? > 0 {
        tracing::info!("Database already initialized, skipping demo seed");
        return Ok(false);
    }

    let mut psychologist = demo_account(
        "cicera.santana",
        "senha123",
        "cicera.santana@clinicamentalize.com",
        "Cícera Santana",
        "(11) 98765-4321",
        Role::Psychologist,
    );
    psychologist.license_number = Some("CRP 12345".to_string());
    psychologist.specialty = Some("Psicologia Clínica".to_string());

    let psychologist = ctx.account_manager.create_account(psychologist).await?;
    let maria = ctx
        .account_manager
        .create_account(demo_account(
            "maria.oliveira",
            "senha456",
            "maria@example.com",
            "Maria Oliveira",
            "(11) 91234-5678",
            Role::Patient,
        ))
        .await?;
    let joao = ctx
        .account_manager
        .create_account(demo_account(
            "joao.santos",
            "senha789",
            "joao@example.com",
            "João Santos",
            "(11) 98765-1234",
            Role::Patient,
        ))
        .await?;

    let missing = || ClinicError::Internal("Seeded account has no profile".to_string());
    let psychologist_id = ctx
        .account_manager
        .profile_id(psychologist.id, Role::Psychologist)
        .await?
        .ok_or_else(missing)?;
    let maria_id = ctx
        .account_manager
        .profile_id(maria.id, Role::Patient)
        .await?
        .ok_or_else(missing)?;
    let joao_id = ctx
        .account_manager
        .profile_id(joao.id, Role::Patient)
        .await?
        .ok_or_else(missing)?;

    for (date, time, patient_id, notes) in [
        ("2024-03-04", "09:00", maria_id, Some("Primeira consulta")),
        ("2024-03-06", "14:00", joao_id, None),
        ("2024-03-11", "09:00", maria_id, Some("Retorno")),
    ] {
        ctx.appointment_manager
            .create(
                psychologist_id,
                NewAppointment {
                    date: date.to_string(),
                    time: time.to_string(),
                    patient_id,
                    notes: notes.map(str::to_string),
                },
            )
            .await?;
    }

    ctx.record_manager
        .create(
            psychologist_id,
            NewRecord {
                date: "2024-03-04".to_string(),
                content: "Avaliação inicial. Paciente relata ansiedade no trabalho.".to_string(),
                patient_id: maria_id,
            },
        )
        .await?;

    tracing::info!("Demo data inserted");

    Ok(true)
}
