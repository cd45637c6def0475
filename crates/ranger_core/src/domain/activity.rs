use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::vocab::vocabulary;
use super::{Evidence, Record, WorkflowStatus};
use crate::audit::AuditTrail;
use crate::policy::{TransitionPolicy, ACTIVITY_POLICY};

vocabulary! {
    pub enum ActivityKind {
        Patrol = "patrol" | "Patrullaje",
        Monitoring = "monitoring" | "Monitoreo",
        Maintenance = "maintenance" | "Mantenimiento",
        Training = "training" | "Capacitación",
        Other = "other" | "Otra",
    }
}

vocabulary! {
    pub enum ActivityStatus {
        Scheduled = "scheduled" | "Programada",
        InProgress = "in_progress" | "En curso",
        Completed = "completed" | "Completada",
        Cancelled = "cancelled" | "Cancelada",
    }
}

/// A scheduled field task assigned to one ranger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub title: String,
    pub kind: ActivityKind,
    pub area: Option<String>,
    pub assigned_to: String,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_for: OffsetDateTime,
    pub status: ActivityStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// Set when the activity reaches `Completed` or `Cancelled`.
    #[serde(with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
    /// Closing notes, appended by a patrol finish.
    pub notes: Vec<String>,
    /// General (not finding-specific) evidence gathered during a patrol.
    pub evidence: Vec<Evidence>,
    pub audit_trail: AuditTrail,
}

impl Activity {
    pub fn is_patrol(&self) -> bool {
        self.kind == ActivityKind::Patrol
    }
}

impl Record for Activity {
    type Status = ActivityStatus;

    const TABLE: &'static str = "activities";
    const LABEL: &'static str = "Activity";

    fn policy() -> &'static TransitionPolicy<ActivityStatus> {
        &ACTIVITY_POLICY
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn status(&self) -> ActivityStatus {
        self.status
    }

    fn owner_id(&self) -> &str {
        &self.assigned_to
    }

    fn audit_trail(&self) -> &AuditTrail {
        &self.audit_trail
    }

    fn audit_trail_mut(&mut self) -> &mut AuditTrail {
        &mut self.audit_trail
    }

    fn enter_status(&mut self, status: ActivityStatus, at: OffsetDateTime) {
        self.status = status;
        if status == ActivityStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(at);
        }
        if ACTIVITY_POLICY.is_terminal(status) && self.closed_at.is_none() {
            self.closed_at = Some(at);
        }
    }

    fn held_by_session(&self) -> bool {
        self.is_patrol() && self.status == ActivityStatus::InProgress
    }
}

impl WorkflowStatus for ActivityStatus {
    type Record = Activity;
}
