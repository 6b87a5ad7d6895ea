/// Appointment persistence
use crate::{
    appointment::{AppointmentChanges, AppointmentStatus, NewAppointment},
    db::models::Appointment,
    error::{ClinicError, ClinicResult},
};
use chrono::Utc;
use sqlx::SqlitePool;

const APPOINTMENT_COLUMNS: &str =
    "id, date, time, status, notes, psychologist_id, patient_id, created_at, updated_at";

const SLOT_TAKEN: &str = "Time slot already booked for this psychologist";

/// Appointment manager service
pub struct AppointmentManager {
    db: SqlitePool,
}

impl AppointmentManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Book a new appointment in `pending` state
    pub async fn create(&self, psychologist_id: i64, new: NewAppointment) -> ClinicResult<Appointment> {
        if self
            .slot_taken(psychologist_id, &new.date, &new.time, None)
            .await?
        {
            return Err(ClinicError::Conflict(SLOT_TAKEN.to_string()));
        }

        let now = Utc::now();
        let status = AppointmentStatus::Pending;

        let result = sqlx::query(
            "INSERT INTO appointment (date, time, status, notes, psychologist_id, patient_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&new.date)
        .bind(&new.time)
        .bind(status.as_str())
        .bind(&new.notes)
        .bind(psychologist_id)
        .bind(new.patient_id)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(slot_conflict)?;

        let id = result.last_insert_rowid();

        tracing::info!(
            appointment_id = id,
            psychologist_id,
            patient_id = new.patient_id,
            "Appointment booked for {} {}",
            new.date,
            new.time
        );

        Ok(Appointment {
            id,
            date: new.date,
            time: new.time,
            status,
            notes: new.notes,
            psychologist_id,
            patient_id: new.patient_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get appointment by id
    pub async fn get(&self, id: i64) -> ClinicResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {} FROM appointment WHERE id = ?1",
            APPOINTMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(appointment)
    }

    /// Appointments owned by a psychologist profile
    pub async fn list_for_psychologist(&self, psychologist_id: i64) -> ClinicResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {} FROM appointment WHERE psychologist_id = ?1 ORDER BY date, time, id",
            APPOINTMENT_COLUMNS
        ))
        .bind(psychologist_id)
        .fetch_all(&self.db)
        .await?;

        Ok(appointments)
    }

    /// Appointments booked for a patient profile
    pub async fn list_for_patient(&self, patient_id: i64) -> ClinicResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {} FROM appointment WHERE patient_id = ?1 ORDER BY date, time, id",
            APPOINTMENT_COLUMNS
        ))
        .bind(patient_id)
        .fetch_all(&self.db)
        .await?;

        Ok(appointments)
    }

    /// Apply already-authorized changes
    pub async fn update(&self, id: i64, changes: AppointmentChanges) -> ClinicResult<Appointment> {
        let mut appointment = self
            .get(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Appointment not found".to_string()))?;

        let moves_slot = changes.date.is_some() || changes.time.is_some();

        if let Some(date) = changes.date {
            appointment.date = date;
        }
        if let Some(time) = changes.time {
            appointment.time = time;
        }
        if let Some(status) = changes.status {
            appointment.status = status;
        }
        if let Some(notes) = changes.notes {
            appointment.notes = notes;
        }

        if moves_slot
            && self
                .slot_taken(
                    appointment.psychologist_id,
                    &appointment.date,
                    &appointment.time,
                    Some(id),
                )
                .await?
        {
            return Err(ClinicError::Conflict(SLOT_TAKEN.to_string()));
        }

        appointment.updated_at = Utc::now();

        sqlx::query(
            "UPDATE appointment SET date = ?1, time = ?2, status = ?3, notes = ?4, updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&appointment.date)
        .bind(&appointment.time)
        .bind(appointment.status.as_str())
        .bind(&appointment.notes)
        .bind(appointment.updated_at)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(slot_conflict)?;

        tracing::info!(appointment_id = id, status = %appointment.status, "Appointment updated");

        Ok(appointment)
    }

    /// Hard delete
    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM appointment WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("Appointment not found".to_string()));
        }

        tracing::info!(appointment_id = id, "Appointment deleted");

        Ok(())
    }

    async fn slot_taken(
        &self,
        psychologist_id: i64,
        date: &str,
        time: &str,
        except: Option<i64>,
    ) -> ClinicResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM appointment
             WHERE psychologist_id = ?1 AND date = ?2 AND time = ?3 AND id != ?4",
        )
        .bind(psychologist_id)
        .bind(date)
        .bind(time)
        .bind(except.unwrap_or(-1))
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }
}

/// A racing insert that hits the slot constraint reports the same conflict
fn slot_conflict(err: sqlx::Error) -> ClinicError {
    if ClinicError::is_unique_violation(&err) {
        ClinicError::Conflict(SLOT_TAKEN.to_string())
    } else {
        ClinicError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::{AccountManager, NewAccount, Role},
        db,
    };

    struct Fixture {
        appointments: AppointmentManager,
        psychologist_id: i64,
        patient_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = db::create_memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let accounts = AccountManager::new(pool.clone());

        let psy = accounts
            .create_account(NewAccount {
                login_name: "psy".to_string(),
                password: "senha123".to_string(),
                email: "psy@teste.com".to_string(),
                display_name: "Dra. Teste".to_string(),
                phone: None,
                role: Role::Psychologist,
                license_number: Some("CRP 1".to_string()),
                specialty: None,
            })
            .await
            .unwrap();
        let pat = accounts
            .create_account(NewAccount {
                login_name: "pat".to_string(),
                password: "senha123".to_string(),
                email: "pat@teste.com".to_string(),
                display_name: "Paciente".to_string(),
                phone: None,
                role: Role::Patient,
                license_number: None,
                specialty: None,
            })
            .await
            .unwrap();

        Fixture {
            appointments: AppointmentManager::new(pool),
            psychologist_id: accounts.profile_id(psy.id, Role::Psychologist).await.unwrap().unwrap(),
            patient_id: accounts.profile_id(pat.id, Role::Patient).await.unwrap().unwrap(),
        }
    }

    fn slot(patient_id: i64, date: &str, time: &str) -> NewAppointment {
        NewAppointment {
            date: date.to_string(),
            time: time.to_string(),
            patient_id,
            notes: Some("Primeira consulta".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let f = setup().await;
        let created = f
            .appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "10:00"))
            .await
            .unwrap();

        let fetched = f.appointments.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.date, "2024-03-15");
        assert_eq!(fetched.time, "10:00");
        assert_eq!(fetched.status, AppointmentStatus::Pending);
        assert_eq!(fetched.notes.as_deref(), Some("Primeira consulta"));
        assert_eq!(fetched.psychologist_id, f.psychologist_id);
        assert_eq!(fetched.patient_id, f.patient_id);
    }

    #[tokio::test]
    async fn test_duplicate_slot_rejected() {
        let f = setup().await;
        f.appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "10:00"))
            .await
            .unwrap();

        let err = f
            .appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        let all = f
            .appointments
            .list_for_psychologist(f.psychologist_id)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_constraint_maps_to_conflict() {
        let f = setup().await;
        f.appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "10:00"))
            .await
            .unwrap();

        // Bypass the pre-check to hit the schema constraint directly
        let err = sqlx::query(
            "INSERT INTO appointment (date, time, status, psychologist_id, patient_id, created_at, updated_at)
             VALUES ('2024-03-15', '10:00', 'pending', ?1, ?2, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(f.psychologist_id)
        .bind(f.patient_id)
        .execute(&f.appointments.db)
        .await
        .unwrap_err();

        assert!(matches!(slot_conflict(err), ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_and_move() {
        let f = setup().await;
        let first = f
            .appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "10:00"))
            .await
            .unwrap();
        let second = f
            .appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "11:00"))
            .await
            .unwrap();

        let updated = f
            .appointments
            .update(
                first.id,
                AppointmentChanges {
                    status: Some(AppointmentStatus::Confirmed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Confirmed);
        assert_eq!(updated.time, "10:00");

        // Moving onto an occupied slot fails and leaves the row alone
        let err = f
            .appointments
            .update(
                second.id,
                AppointmentChanges {
                    time: Some("10:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
        let second = f.appointments.get(second.id).await.unwrap().unwrap();
        assert_eq!(second.time, "11:00");
    }

    #[tokio::test]
    async fn test_update_clears_notes() {
        let f = setup().await;
        let created = f
            .appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "10:00"))
            .await
            .unwrap();

        // Absent notes leave the stored value alone
        f.appointments
            .update(
                created.id,
                AppointmentChanges {
                    status: Some(AppointmentStatus::Confirmed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let fetched = f.appointments.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.notes.as_deref(), Some("Primeira consulta"));

        let updated = f
            .appointments
            .update(
                created.id,
                AppointmentChanges {
                    notes: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.notes.is_none());
        let fetched = f.appointments.get(created.id).await.unwrap().unwrap();
        assert!(fetched.notes.is_none());
        assert_eq!(fetched.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let f = setup().await;
        let a = f
            .appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-16", "09:00"))
            .await
            .unwrap();
        f.appointments
            .create(f.psychologist_id, slot(f.patient_id, "2024-03-15", "09:00"))
            .await
            .unwrap();

        let for_patient = f.appointments.list_for_patient(f.patient_id).await.unwrap();
        assert_eq!(for_patient.len(), 2);
        assert_eq!(for_patient[0].date, "2024-03-15");

        f.appointments.delete(a.id).await.unwrap();
        assert!(f.appointments.get(a.id).await.unwrap().is_none());
        assert!(matches!(
            f.appointments.delete(a.id).await,
            Err(ClinicError::NotFound(_))
        ));
    }
}
