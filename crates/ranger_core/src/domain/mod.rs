//! Records tracked by the field-operations console: incidents, findings and the scheduled
//! activities (patrols among them) that spawn findings.

pub mod activity;
pub mod case;
pub mod draft;
pub mod vocab;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::audit::AuditTrail;
use crate::policy::TransitionPolicy;

pub use activity::{Activity, ActivityKind, ActivityStatus};
pub use case::{
    CaseRecord, CaseType, Finding, FindingCase, FindingKind, FindingSeverity, FindingStatus,
    Incident, IncidentCase, IncidentKind, IncidentSeverity, IncidentStatus,
};
pub use draft::{ActivityDraft, ActivityPatch, CaseDraft, CasePatch, EvidenceDraft, LocationInput};
pub use vocab::{SeverityScale, Vocabulary};

vocab::vocabulary! {
    pub enum Role {
        FieldOfficer = "field_officer" | "Guardaparque",
        Supervisor = "supervisor" | "Supervisor",
        Administrator = "administrator" | "Administrador",
    }
}

/// The principal performing an action. Authentication happens outside the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// Field officers only see (and act on) their own reports and assignments.
    pub fn is_field_scoped(&self) -> bool {
        self.role == Role::FieldOfficer
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where something happened. At least one of `place` and `coordinates` is present on every
/// committed record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Location {
    pub place: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

vocab::vocabulary! {
    pub enum EvidenceCategory {
        Photo = "photo" | "Fotografía",
        Document = "document" | "Documento",
        Sample = "sample" | "Muestra",
        Audio = "audio" | "Audio",
        Video = "video" | "Video",
        Other = "other" | "Otro",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    /// URL or upload handle issued by the file collaborator.
    pub reference: String,
    /// sha256 of the trimmed reference, used to reject duplicates on one record.
    pub fingerprint: String,
    pub description: String,
    pub category: EvidenceCategory,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

/// Anything persisted through a [`crate::store::CaseStore`] and driven by a transition policy.
pub trait Record: Clone + Serialize + DeserializeOwned + 'static {
    type Status: Vocabulary;

    /// Store table; also the record family name in logs.
    const TABLE: &'static str;
    /// Human label used in error messages ("Incident", "Finding", "Activity").
    const LABEL: &'static str;

    fn policy() -> &'static TransitionPolicy<Self::Status>;

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn status(&self) -> Self::Status;

    /// Actor the record belongs to for visibility and edit rights.
    fn owner_id(&self) -> &str;

    fn audit_trail(&self) -> &AuditTrail;
    fn audit_trail_mut(&mut self) -> &mut AuditTrail;

    /// Move to `status`, stamping the terminal timestamp when `status` is terminal.
    ///
    /// Only [`crate::policy::apply_transition`] calls this, after the edge has been checked.
    fn enter_status(&mut self, status: Self::Status, at: OffsetDateTime);

    fn is_terminal(&self) -> bool {
        Self::policy().is_terminal(self.status())
    }

    /// The current status is owned by an open patrol session and only its finish may move it.
    fn held_by_session(&self) -> bool {
        false
    }
}

/// Ties a status vocabulary back to the record it belongs to, so a bare status value is enough
/// to pick the workflow.
pub trait WorkflowStatus: Vocabulary {
    type Record: Record<Status = Self>;
}
