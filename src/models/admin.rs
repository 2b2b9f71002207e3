//! Admin dashboard models.

use serde::Serialize;

use super::{ContactMessage, Report};

/// Aggregate counts for the dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub total_reports: i64,
    pub total_contacts: i64,
    pub total_admins: i64,
}

/// Dashboard payload: counts plus the latest activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: AdminStats,
    pub recent_contacts: Vec<ContactMessage>,
    pub recent_reports: Vec<Report>,
}
