//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    AdminStats, BarrierType, ContactMessage, CreateContactRequest, CreateTeamProfileRequest,
    Report, ReportStatus, Severity, TeamProfile, UpdateReportRequest,
};

pub(super) const REPORT_COLUMNS: &str = "id, street, description, extra_info, image_url, latitude, longitude, created_at, updated_at, barrier_type, severity, status, comments, submitter_id, submitter_email";

/// A validated report ready to be stored.
#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub street: String,
    pub description: String,
    pub extra_info: Option<String>,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub barrier_type: Option<BarrierType>,
    pub severity: Option<Severity>,
    pub status: Option<ReportStatus>,
    pub comments: Vec<String>,
    pub submitter_id: Option<String>,
    pub submitter_email: Option<String>,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== REPORT OPERATIONS ====================

    /// List all reports, oldest first.
    pub async fn list_reports(&self) -> Result<Vec<Report>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM reports ORDER BY created_at, id",
            REPORT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(report_from_row).collect())
    }

    /// The `limit` most recently created reports, newest first.
    pub async fn recent_reports(&self, limit: i64) -> Result<Vec<Report>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM reports ORDER BY created_at DESC, id LIMIT ?",
            REPORT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(report_from_row).collect())
    }

    /// Get a report by ID.
    pub async fn get_report(&self, id: &str) -> Result<Option<Report>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(report_from_row))
    }

    /// Create a report. When it has a submitter, the ownership link is written
    /// in the same transaction.
    pub async fn create_report(&self, report: &NewReport) -> Result<Report, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let comments_json = serde_json::to_string(&report.comments)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO reports (
                id, street, description, extra_info, image_url, latitude, longitude,
                created_at, updated_at, barrier_type, severity, status, comments,
                submitter_id, submitter_email
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&report.street)
        .bind(&report.description)
        .bind(&report.extra_info)
        .bind(&report.image_url)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(&now)
        .bind(&now)
        .bind(report.barrier_type.map(|t| t.as_str()))
        .bind(report.severity.map(|s| s.as_str()))
        .bind(report.status.map(|s| s.as_str()))
        .bind(&comments_json)
        .bind(&report.submitter_id)
        .bind(&report.submitter_email)
        .execute(&mut *tx)
        .await?;

        if let Some(user_id) = &report.submitter_id {
            sqlx::query(
                "INSERT OR IGNORE INTO user_reports (user_id, report_id, linked_at) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(&id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(report_id = %id, "Report created");

        Ok(Report {
            id,
            street: report.street.clone(),
            description: report.description.clone(),
            extra_info: report.extra_info.clone(),
            image_url: report.image_url.clone(),
            latitude: Some(report.latitude),
            longitude: Some(report.longitude),
            created_at: now.clone(),
            updated_at: now,
            barrier_type: report.barrier_type,
            severity: report.severity,
            status: report.status,
            comments: report.comments.clone(),
            submitter_id: report.submitter_id.clone(),
            submitter_email: report.submitter_email.clone(),
        })
    }

    /// Patch a report. Concurrent edits are last-write-wins. Comments are
    /// left alone; they only grow through [`Repository::add_comment`].
    pub async fn update_report(
        &self,
        id: &str,
        request: &UpdateReportRequest,
        severity: Option<Severity>,
        status: Option<ReportStatus>,
    ) -> Result<Report, AppError> {
        let existing = self
            .get_report(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        let now = now_timestamp();

        let street = request.street.clone().unwrap_or(existing.street);
        let description = request.description.clone().unwrap_or(existing.description);
        let extra_info = request.extra_info.clone().or(existing.extra_info);
        let image_url = match &request.image_url {
            Some(replacement) => replacement.clone(),
            None => existing.image_url,
        };
        let latitude = request.latitude.or(existing.latitude);
        let longitude = request.longitude.or(existing.longitude);
        let barrier_type = request.barrier_type.or(existing.barrier_type);
        let severity = severity.or(existing.severity);
        let status = status.or(existing.status);

        let result = sqlx::query(
            r#"UPDATE reports SET
                street = ?, description = ?, extra_info = ?, image_url = ?,
                latitude = ?, longitude = ?, updated_at = ?, barrier_type = ?,
                severity = ?, status = ?
            WHERE id = ?"#,
        )
        .bind(&street)
        .bind(&description)
        .bind(&extra_info)
        .bind(&image_url)
        .bind(latitude)
        .bind(longitude)
        .bind(&now)
        .bind(barrier_type.map(|t| t.as_str()))
        .bind(severity.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Report {} not found", id)));
        }

        Ok(Report {
            id: id.to_string(),
            street,
            description,
            extra_info,
            image_url,
            latitude,
            longitude,
            created_at: existing.created_at,
            updated_at: now,
            barrier_type,
            severity,
            status,
            comments: existing.comments,
            submitter_id: existing.submitter_id,
            submitter_email: existing.submitter_email,
        })
    }

    /// Append a comment at the end of the report's comment list.
    pub async fn add_comment(&self, id: &str, text: &str) -> Result<Report, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT comments FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        let comments_str: String = row.get("comments");
        let mut comments = parse_json_array(&comments_str);
        comments.push(text.to_string());

        sqlx::query("UPDATE reports SET comments = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&comments)?)
            .bind(now_timestamp())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_report(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))
    }

    /// Delete a report. Ownership links go with it.
    pub async fn delete_report(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Report {} not found", id)));
        }

        tracing::info!(report_id = %id, "Report deleted");
        Ok(())
    }

    // ==================== CONTACT OPERATIONS ====================

    /// Store a contact form message.
    pub async fn create_contact(
        &self,
        request: &CreateContactRequest,
    ) -> Result<ContactMessage, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO contact_messages (id, name, email, message, created_at, read) VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(request.email.trim())
        .bind(request.message.trim())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(ContactMessage {
            id,
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            message: request.message.trim().to_string(),
            created_at: now,
            read: false,
        })
    }

    /// List contact messages, newest first. `None` lists all of them.
    pub async fn list_contacts(&self, limit: Option<i64>) -> Result<Vec<ContactMessage>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, email, message, created_at, read FROM contact_messages ORDER BY created_at DESC, id LIMIT ?",
        )
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(contact_from_row).collect())
    }

    /// Mark a contact message as read.
    pub async fn mark_contact_read(&self, id: &str) -> Result<ContactMessage, AppError> {
        let result = sqlx::query("UPDATE contact_messages SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Contact message {} not found", id)));
        }

        let row = sqlx::query(
            "SELECT id, name, email, message, created_at, read FROM contact_messages WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(contact_from_row(&row))
    }

    // ==================== TEAM OPERATIONS ====================

    /// List the team roster in the order it was entered.
    pub async fn list_team(&self) -> Result<Vec<TeamProfile>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, image_url, linkedin, github, description, created_at FROM team_members ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(team_from_row).collect())
    }

    /// Add someone to the team roster.
    pub async fn create_team_member(
        &self,
        request: &CreateTeamProfileRequest,
    ) -> Result<TeamProfile, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO team_members (id, name, image_url, linkedin, github, description, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(&request.image_url)
        .bind(&request.linkedin)
        .bind(&request.github)
        .bind(&request.description)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(TeamProfile {
            id,
            name: request.name.trim().to_string(),
            image_url: request.image_url.clone(),
            linkedin: request.linkedin.clone(),
            github: request.github.clone(),
            description: request.description.clone(),
            created_at: now,
        })
    }

    /// Remove someone from the team roster.
    pub async fn delete_team_member(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Team member {} not found", id)));
        }

        Ok(())
    }

    // ==================== STATS ====================

    /// Aggregate counts for the admin dashboard.
    pub async fn get_stats(&self) -> Result<AdminStats, AppError> {
        let row = sqlx::query(
            r#"SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM reports) AS total_reports,
                (SELECT COUNT(*) FROM contact_messages) AS total_contacts,
                (SELECT COUNT(*) FROM team_members) AS total_admins"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminStats {
            total_users: row.get("total_users"),
            total_reports: row.get("total_reports"),
            total_contacts: row.get("total_contacts"),
            total_admins: row.get("total_admins"),
        })
    }
}

/// Current time in the format every timestamp column uses.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Helper functions for row conversion

pub(super) fn report_from_row(row: &sqlx::sqlite::SqliteRow) -> Report {
    let comments_str: String = row.get("comments");
    let barrier_type: Option<String> = row.get("barrier_type");
    let severity: Option<String> = row.get("severity");
    let status: Option<String> = row.get("status");

    Report {
        id: row.get("id"),
        street: row.get("street"),
        description: row.get("description"),
        extra_info: row.get("extra_info"),
        image_url: row.get("image_url"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        barrier_type: barrier_type.and_then(|s| BarrierType::parse(&s)),
        severity: severity.and_then(|s| Severity::parse(&s)),
        status: status.and_then(|s| ReportStatus::parse(&s)),
        comments: parse_json_array(&comments_str),
        submitter_id: row.get("submitter_id"),
        submitter_email: row.get("submitter_email"),
    }
}

fn contact_from_row(row: &sqlx::sqlite::SqliteRow) -> ContactMessage {
    let read: i32 = row.get("read");
    ContactMessage {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        message: row.get("message"),
        created_at: row.get("created_at"),
        read: read != 0,
    }
}

fn team_from_row(row: &sqlx::sqlite::SqliteRow) -> TeamProfile {
    TeamProfile {
        id: row.get("id"),
        name: row.get("name"),
        image_url: row.get("image_url"),
        linkedin: row.get("linkedin"),
        github: row.get("github"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

pub(super) fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
