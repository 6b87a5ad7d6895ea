/// Medical record persistence
use crate::{
    db::models::MedicalRecord,
    error::{ClinicError, ClinicResult},
    medical_record::{NewRecord, UpdateRecordRequest},
};
use chrono::Utc;
use sqlx::SqlitePool;

const RECORD_COLUMNS: &str = "id, date, content, patient_id, psychologist_id, created_at, updated_at";

/// Medical record manager service
pub struct RecordManager {
    db: SqlitePool,
}

impl RecordManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Store a record authored by `psychologist_id`
    pub async fn create(&self, psychologist_id: i64, new: NewRecord) -> ClinicResult<MedicalRecord> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO medical_record (date, content, patient_id, psychologist_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&new.date)
        .bind(&new.content)
        .bind(new.patient_id)
        .bind(psychologist_id)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();

        tracing::info!(record_id = id, psychologist_id, patient_id = new.patient_id, "Medical record created");

        Ok(MedicalRecord {
            id,
            date: new.date,
            content: new.content,
            patient_id: new.patient_id,
            psychologist_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Option<MedicalRecord>> {
        let record = sqlx::query_as::<_, MedicalRecord>(&format!(
            "SELECT {} FROM medical_record WHERE id = ?1",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    /// Records authored by a psychologist, optionally about one patient
    pub async fn list_for_psychologist(
        &self,
        psychologist_id: i64,
        patient_id: Option<i64>,
    ) -> ClinicResult<Vec<MedicalRecord>> {
        let records = match patient_id {
            Some(patient_id) => {
                sqlx::query_as::<_, MedicalRecord>(&format!(
                    "SELECT {} FROM medical_record
                     WHERE psychologist_id = ?1 AND patient_id = ?2 ORDER BY date, id",
                    RECORD_COLUMNS
                ))
                .bind(psychologist_id)
                .bind(patient_id)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, MedicalRecord>(&format!(
                    "SELECT {} FROM medical_record WHERE psychologist_id = ?1 ORDER BY date, id",
                    RECORD_COLUMNS
                ))
                .bind(psychologist_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(records)
    }

    /// Records about a patient
    pub async fn list_for_patient(&self, patient_id: i64) -> ClinicResult<Vec<MedicalRecord>> {
        let records = sqlx::query_as::<_, MedicalRecord>(&format!(
            "SELECT {} FROM medical_record WHERE patient_id = ?1 ORDER BY date, id",
            RECORD_COLUMNS
        ))
        .bind(patient_id)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    pub async fn update(&self, id: i64, changes: UpdateRecordRequest) -> ClinicResult<MedicalRecord> {
        let mut record = self
            .get(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Medical record not found".to_string()))?;

        if let Some(date) = changes.date {
            record.date = date;
        }
        if let Some(content) = changes.content {
            record.content = content;
        }
        record.updated_at = Utc::now();

        sqlx::query("UPDATE medical_record SET date = ?1, content = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(&record.date)
            .bind(&record.content)
            .bind(record.updated_at)
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(record_id = id, "Medical record updated");

        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM medical_record WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("Medical record not found".to_string()));
        }

        tracing::info!(record_id = id, "Medical record deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::{AccountManager, NewAccount, Role},
        db,
    };

    async fn setup() -> (RecordManager, i64, i64, i64) {
        let pool = db::create_memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let accounts = AccountManager::new(pool.clone());

        let mut profile_ids = Vec::new();
        for (login, role) in [
            ("psy", Role::Psychologist),
            ("pat1", Role::Patient),
            ("pat2", Role::Patient),
        ] {
            let account = accounts
                .create_account(NewAccount {
                    login_name: login.to_string(),
                    password: "senha123".to_string(),
                    email: format!("{}@teste.com", login),
                    display_name: login.to_string(),
                    phone: None,
                    role,
                    license_number: Some("CRP 1".to_string()),
                    specialty: None,
                })
                .await
                .unwrap();
            profile_ids.push(accounts.profile_id(account.id, role).await.unwrap().unwrap());
        }

        (RecordManager::new(pool), profile_ids[0], profile_ids[1], profile_ids[2])
    }

    fn record(patient_id: i64, date: &str) -> NewRecord {
        NewRecord {
            date: date.to_string(),
            content: "Sessão inicial".to_string(),
            patient_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_filter() {
        let (records, psy, pat1, pat2) = setup().await;
        records.create(psy, record(pat1, "2024-03-01")).await.unwrap();
        records.create(psy, record(pat1, "2024-03-08")).await.unwrap();
        records.create(psy, record(pat2, "2024-03-02")).await.unwrap();

        assert_eq!(records.list_for_psychologist(psy, None).await.unwrap().len(), 3);
        assert_eq!(records.list_for_psychologist(psy, Some(pat1)).await.unwrap().len(), 2);
        assert_eq!(records.list_for_patient(pat2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_patient_rejected_by_schema() {
        let (records, psy, _, _) = setup().await;
        assert!(records.create(psy, record(999, "2024-03-01")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (records, psy, pat1, _) = setup().await;
        let created = records.create(psy, record(pat1, "2024-03-01")).await.unwrap();

        let updated = records
            .update(
                created.id,
                UpdateRecordRequest {
                    date: None,
                    content: Some("Evolução positiva".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.content, "Evolução positiva");
        assert_eq!(updated.date, "2024-03-01");
        assert_eq!(updated.patient_id, pat1);

        records.delete(created.id).await.unwrap();
        assert!(records.get(created.id).await.unwrap().is_none());
        assert!(matches!(
            records.delete(created.id).await,
            Err(ClinicError::NotFound(_))
        ));
    }
}
