//! Accounts, sessions and report ownership.

use sqlx::Row;

use super::repository::{
    now_timestamp, parse_json_array, report_from_row, Repository, REPORT_COLUMNS,
};
use crate::errors::AppError;
use crate::models::{normalize_email, LegacyUser, Report, UpdateProfileRequest, UserProfile};

const USER_SELECT: &str = r#"SELECT id, email, name, surname, birth_date, gender, email_verified,
    is_admin, photo_url, created_at, last_login,
    (SELECT json_group_array(report_id) FROM user_reports ur WHERE ur.user_id = users.id) AS report_ids
    FROM users"#;

/// An account about to be stored. The password is already hashed.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub surname: String,
    pub birth_date: String,
    pub gender: String,
    pub email_verified: bool,
    pub is_admin: bool,
    pub photo_url: Option<String>,
}

impl Repository {
    // ==================== USER OPERATIONS ====================

    /// Create an account. Emails are unique regardless of case.
    pub async fn create_user(&self, user: &NewUser) -> Result<UserProfile, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        self.insert_user(&id, user, &now, &now).await?;

        tracing::info!(user_id = %id, "Account created");

        self.get_user(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Account vanished after insert".to_string()))
    }

    async fn insert_user(
        &self,
        id: &str,
        user: &NewUser,
        created_at: &str,
        last_login: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"INSERT INTO users (
                id, email, password_hash, name, surname, birth_date, gender,
                email_verified, is_admin, photo_url, created_at, last_login
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id)
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.birth_date)
        .bind(&user.gender)
        .bind(user.email_verified as i32)
        .bind(user.is_admin as i32)
        .bind(&user.photo_url)
        .bind(created_at)
        .bind(last_login)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AppError::DuplicateAccount("An account with this email already exists".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by email, ignoring case.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query(&format!("{} WHERE email = ?", USER_SELECT))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// The stored password hash for an email, together with the account.
    pub async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(UserProfile, String)>, AppError> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let password_hash: String = row.get("password_hash");

        Ok(self.get_user(&id).await?.map(|user| (user, password_hash)))
    }

    /// List all accounts, oldest first.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY created_at, id", USER_SELECT))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Record a successful login.
    pub async fn touch_last_login(&self, id: &str) -> Result<UserProfile, AppError> {
        self.set_user_column(id, "last_login", now_timestamp()).await
    }

    /// Mark the account's email as verified.
    pub async fn set_email_verified(&self, id: &str) -> Result<UserProfile, AppError> {
        self.set_user_column(id, "email_verified", 1).await
    }

    /// Grant or revoke the administrator role.
    pub async fn set_admin(&self, id: &str, is_admin: bool) -> Result<UserProfile, AppError> {
        self.set_user_column(id, "is_admin", is_admin as i32).await
    }

    async fn set_user_column<T>(
        &self,
        id: &str,
        column: &'static str,
        value: T,
    ) -> Result<UserProfile, AppError>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite> + Send + 'static,
    {
        let result = sqlx::query(&format!("UPDATE users SET {} = ? WHERE id = ?", column))
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Update the editable profile fields.
    pub async fn update_profile(
        &self,
        id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let name = request.name.clone().unwrap_or(existing.name);
        let surname = request.surname.clone().unwrap_or(existing.surname);
        let birth_date = request.birth_date.clone().unwrap_or(existing.birth_date);
        let gender = request.gender.clone().unwrap_or(existing.gender);

        sqlx::query(
            "UPDATE users SET name = ?, surname = ?, birth_date = ?, gender = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&surname)
        .bind(&birth_date)
        .bind(&gender)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Delete an account. Its sessions and ownership links go with it; its
    /// reports stay and lose their submitter.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        tracing::info!(user_id = %id, "Account deleted");
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Store a session under the hash of its token.
    pub async fn create_session(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(now_timestamp())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The account behind a live session. Expired sessions resolve to nothing.
    pub async fn find_session_user(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query("SELECT user_id FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(token_hash)
            .bind(now_timestamp())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let user_id: String = row.get("user_id");
                self.get_user(&user_id).await
            }
            None => Ok(None),
        }
    }

    /// End a session. Returns whether one existed.
    pub async fn delete_session(&self, token_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop sessions past their expiry.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ==================== OWNERSHIP ====================

    /// Link every report submitted under the user's email that is not yet
    /// linked. Returns how many links were added.
    pub async fn reconcile_email_reports(&self, user: &UserProfile) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO user_reports (user_id, report_id, linked_at)
            SELECT ?, id, ? FROM reports WHERE submitter_email = ? COLLATE NOCASE"#,
        )
        .bind(&user.uid)
        .bind(now_timestamp())
        .bind(normalize_email(&user.email))
        .execute(&self.pool)
        .await?;

        let linked = result.rows_affected();
        if linked > 0 {
            tracing::debug!(user_id = %user.uid, linked, "Linked reports by email");
        }
        Ok(linked)
    }

    /// Reports owned by a user, newest first.
    pub async fn reports_for_user(&self, user_id: &str) -> Result<Vec<Report>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM reports
            WHERE id IN (SELECT report_id FROM user_reports WHERE user_id = ?)
            ORDER BY created_at DESC, id"#,
            REPORT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(report_from_row).collect())
    }

    /// Store an account exported from the browser's local storage.
    ///
    /// Returns `None` when the email is already taken, otherwise the number of
    /// listed reports that exist here and were linked to the new account.
    pub async fn import_legacy_user(
        &self,
        legacy: &LegacyUser,
        password_hash: String,
        is_admin: bool,
    ) -> Result<Option<u64>, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let created_at = legacy.created_at.clone().unwrap_or_else(|| now.clone());
        let last_login = legacy.last_login.clone().unwrap_or_else(|| created_at.clone());

        let user = NewUser {
            email: legacy.email.clone(),
            password_hash,
            name: legacy.name.clone(),
            surname: legacy.surname.clone(),
            birth_date: legacy.birth_date.clone(),
            gender: legacy.gender.clone(),
            email_verified: legacy.email_verified,
            is_admin,
            photo_url: legacy.photo_url.clone(),
        };

        match self.insert_user(&id, &user, &created_at, &last_login).await {
            Ok(()) => {}
            Err(AppError::DuplicateAccount(_)) => return Ok(None),
            Err(e) => return Err(e),
        }

        let mut linked = 0;
        for report_id in &legacy.reports {
            let result = sqlx::query(
                r#"INSERT OR IGNORE INTO user_reports (user_id, report_id, linked_at)
                SELECT ?, id, ? FROM reports WHERE id = ?"#,
            )
            .bind(&id)
            .bind(&now)
            .bind(report_id)
            .execute(&self.pool)
            .await?;
            linked += result.rows_affected();
        }

        Ok(Some(linked))
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> UserProfile {
    let report_ids: String = row.get("report_ids");
    let email_verified: i32 = row.get("email_verified");
    let is_admin: i32 = row.get("is_admin");

    UserProfile {
        uid: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        surname: row.get("surname"),
        birth_date: row.get("birth_date"),
        gender: row.get("gender"),
        reports: parse_json_array(&report_ids),
        email_verified: email_verified != 0,
        is_admin: is_admin != 0,
        photo_url: row.get("photo_url"),
        created_at: row.get("created_at"),
        last_login: row.get("last_login"),
    }
}
