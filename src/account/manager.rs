/// Account manager implementation using runtime queries
use crate::{
    account::{AccountDetails, NewAccount, Role, UpdateAccountRequest},
    crypto::PasswordHasher,
    db::models::{Account, PatientProfile, PatientView, PsychologistProfile, PsychologistView},
    error::{ClinicError, ClinicResult},
};
use chrono::Utc;
use sqlx::SqlitePool;

const ACCOUNT_COLUMNS: &str = "id, login_name, password_hash, email, display_name, phone, role, created_at, updated_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create an account and its role profile in one transaction
    pub async fn create_account(&self, new: NewAccount) -> ClinicResult<Account> {
        if self.login_exists(&new.login_name).await? {
            return Err(ClinicError::Conflict("login already exists".to_string()));
        }

        if self.email_taken(&new.email, None).await? {
            return Err(ClinicError::Conflict("email already in use".to_string()));
        }

        if new.role == Role::Psychologist && new.license_number.is_none() {
            return Err(ClinicError::Validation(
                "licenseNumber is required for psychologists".to_string(),
            ));
        }

        let password_hash = PasswordHasher::hash(&new.password);
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            "INSERT INTO account (login_name, password_hash, email, display_name, phone, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&new.login_name)
        .bind(&password_hash)
        .bind(&new.email)
        .bind(&new.display_name)
        .bind(&new.phone)
        .bind(new.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if ClinicError::is_unique_violation(&e) {
                ClinicError::Conflict("login or email already exists".to_string())
            } else {
                ClinicError::Database(e)
            }
        })?;

        let id = result.last_insert_rowid();

        match new.role {
            Role::Psychologist => {
                sqlx::query(
                    "INSERT INTO psychologist_profile (account_id, license_number, specialty, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .bind(id)
                .bind(&new.license_number)
                .bind(&new.specialty)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            Role::Patient => {
                sqlx::query(
                    "INSERT INTO patient_profile (account_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3)",
                )
                .bind(id)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(account_id = id, role = %new.role, "Registered account {}", new.login_name);

        Ok(Account {
            id,
            login_name: new.login_name,
            password_hash,
            email: new.email,
            display_name: new.display_name,
            phone: new.phone,
            role: new.role,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check credentials and return the matching account
    pub async fn login(&self, login_name: &str, password: &str) -> ClinicResult<Account> {
        let account = self.get_account_by_login(login_name).await?;

        let valid = account
            .as_ref()
            .map(|a| PasswordHasher::verify(password, &a.password_hash))
            .unwrap_or(false);

        match account {
            Some(account) if valid => Ok(account),
            _ => {
                tracing::warn!("Rejected login for {}", login_name);
                Err(ClinicError::Authentication("Invalid credentials".to_string()))
            }
        }
    }

    /// Get account by id
    pub async fn get_account(&self, id: i64) -> ClinicResult<Account> {
        self.find_account(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Account not found".to_string()))
    }

    /// Account together with its role profile
    pub async fn account_details(&self, id: i64) -> ClinicResult<AccountDetails> {
        let account = self.get_account(id).await?;

        let (psychologist, patient) = match account.role {
            Role::Psychologist => (self.psychologist_for_account(id).await?, None),
            Role::Patient => (None, self.patient_for_account(id).await?),
        };

        Ok(AccountDetails {
            account,
            psychologist,
            patient,
        })
    }

    /// Find account by id
    pub async fn find_account(&self, id: i64) -> ClinicResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    /// Get account by login name
    async fn get_account_by_login(&self, login_name: &str) -> ClinicResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE login_name = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(login_name)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    /// List accounts, optionally restricted to one role
    pub async fn list_accounts(&self, role: Option<Role>) -> ClinicResult<Vec<Account>> {
        let accounts = match role {
            Some(role) => {
                sqlx::query_as::<_, Account>(&format!(
                    "SELECT {} FROM account WHERE role = ?1 ORDER BY id",
                    ACCOUNT_COLUMNS
                ))
                .bind(role.as_str())
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Account>(&format!(
                    "SELECT {} FROM account ORDER BY id",
                    ACCOUNT_COLUMNS
                ))
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(accounts)
    }

    /// Number of accounts in the store
    pub async fn count_accounts(&self) -> ClinicResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    /// Apply a self-service update
    ///
    /// Role is never changed. License and specialty only apply to psychologists.
    pub async fn update_account(&self, id: i64, changes: &UpdateAccountRequest) -> ClinicResult<Account> {
        let mut account = self.get_account(id).await?;

        if let Some(email) = &changes.email {
            if email != &account.email && self.email_taken(email, Some(id)).await? {
                return Err(ClinicError::Conflict("email already in use".to_string()));
            }
            account.email = email.clone();
        }
        if let Some(display_name) = &changes.display_name {
            account.display_name = display_name.clone();
        }
        if let Some(phone) = &changes.phone {
            account.phone = Some(phone.clone());
        }
        if let Some(password) = changes.password.as_deref().filter(|p| !p.is_empty()) {
            account.password_hash = PasswordHasher::hash(password);
        }

        let now = Utc::now();
        account.updated_at = now;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE account SET email = ?1, display_name = ?2, phone = ?3, password_hash = ?4, updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if ClinicError::is_unique_violation(&e) {
                ClinicError::Conflict("email already in use".to_string())
            } else {
                ClinicError::Database(e)
            }
        })?;

        if account.role == Role::Psychologist
            && (changes.license_number.is_some() || changes.specialty.is_some())
        {
            sqlx::query(
                "UPDATE psychologist_profile
                 SET license_number = COALESCE(?1, license_number),
                     specialty = COALESCE(?2, specialty),
                     updated_at = ?3
                 WHERE account_id = ?4",
            )
            .bind(&changes.license_number)
            .bind(&changes.specialty)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(account_id = id, "Account updated");

        Ok(account)
    }

    /// Delete an account; profiles, appointments and records cascade
    pub async fn delete_account(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM account WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("Account not found".to_string()));
        }

        tracing::info!(account_id = id, "Account deleted");

        Ok(())
    }

    /// Check if login name exists
    async fn login_exists(&self, login_name: &str) -> ClinicResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE login_name = ?1")
            .bind(login_name)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Check if email is used by an account other than `except`
    async fn email_taken(&self, email: &str, except: Option<i64>) -> ClinicResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1 AND id != ?2")
                .bind(email)
                .bind(except.unwrap_or(-1))
                .fetch_one(&self.db)
                .await?;

        Ok(count > 0)
    }

    /// Psychologist profile owned by an account
    pub async fn psychologist_for_account(&self, account_id: i64) -> ClinicResult<Option<PsychologistProfile>> {
        let profile = sqlx::query_as::<_, PsychologistProfile>(
            "SELECT id, account_id, license_number, specialty, created_at, updated_at
             FROM psychologist_profile WHERE account_id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    /// Patient profile owned by an account
    pub async fn patient_for_account(&self, account_id: i64) -> ClinicResult<Option<PatientProfile>> {
        let profile = sqlx::query_as::<_, PatientProfile>(
            "SELECT id, account_id, created_at, updated_at
             FROM patient_profile WHERE account_id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    /// Profile id of an account for the given role
    pub async fn profile_id(&self, account_id: i64, role: Role) -> ClinicResult<Option<i64>> {
        let id = match role {
            Role::Psychologist => self.psychologist_for_account(account_id).await?.map(|p| p.id),
            Role::Patient => self.patient_for_account(account_id).await?.map(|p| p.id),
        };

        Ok(id)
    }

    /// Get patient profile by profile id
    pub async fn get_patient(&self, patient_id: i64) -> ClinicResult<Option<PatientProfile>> {
        let profile = sqlx::query_as::<_, PatientProfile>(
            "SELECT id, account_id, created_at, updated_at FROM patient_profile WHERE id = ?1",
        )
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    /// Get psychologist profile by profile id
    pub async fn get_psychologist(&self, psychologist_id: i64) -> ClinicResult<Option<PsychologistProfile>> {
        let profile = sqlx::query_as::<_, PsychologistProfile>(
            "SELECT id, account_id, license_number, specialty, created_at, updated_at
             FROM psychologist_profile WHERE id = ?1",
        )
        .bind(psychologist_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    /// Patient profile with its account
    pub async fn patient_view(&self, patient_id: i64) -> ClinicResult<Option<PatientView>> {
        match self.get_patient(patient_id).await? {
            Some(profile) => {
                let account = self.find_account(profile.account_id).await?;
                Ok(Some(PatientView { profile, account }))
            }
            None => Ok(None),
        }
    }

    /// Psychologist profile with its account
    pub async fn psychologist_view(&self, psychologist_id: i64) -> ClinicResult<Option<PsychologistView>> {
        match self.get_psychologist(psychologist_id).await? {
            Some(profile) => {
                let account = self.find_account(profile.account_id).await?;
                Ok(Some(PsychologistView { profile, account }))
            }
            None => Ok(None),
        }
    }

    /// All psychologists with their accounts
    pub async fn list_psychologists(&self) -> ClinicResult<Vec<PsychologistView>> {
        let profiles = sqlx::query_as::<_, PsychologistProfile>(
            "SELECT id, account_id, license_number, specialty, created_at, updated_at
             FROM psychologist_profile ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        let mut views = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let account = self.find_account(profile.account_id).await?;
            views.push(PsychologistView { profile, account });
        }

        Ok(views)
    }

    /// All patients with their accounts
    pub async fn list_patients(&self) -> ClinicResult<Vec<PatientView>> {
        let profiles = sqlx::query_as::<_, PatientProfile>(
            "SELECT id, account_id, created_at, updated_at FROM patient_profile ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        let mut views = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let account = self.find_account(profile.account_id).await?;
            views.push(PatientView { profile, account });
        }

        Ok(views)
    }
}
