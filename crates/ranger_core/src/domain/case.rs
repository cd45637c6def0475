use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::vocab::{vocabulary, SeverityScale, Vocabulary};
use super::{Evidence, Location, Record, WorkflowStatus};
use crate::audit::AuditTrail;
use crate::policy::{TransitionPolicy, FINDING_POLICY, INCIDENT_POLICY};

/// Marker describing one family of cases: its vocabularies and its workflow.
pub trait CaseType:
    fmt::Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static
{
    const TABLE: &'static str;
    const LABEL: &'static str;

    type Kind: Vocabulary;
    type Severity: SeverityScale;
    type Status: Vocabulary;

    fn policy() -> &'static TransitionPolicy<Self::Status>;
}

vocabulary! {
    pub enum IncidentKind {
        Visitor = "visitor" | "Turista",
        Community = "community" | "Comunidad",
        Emergency = "emergency" | "Emergencia",
        Authority = "authority" | "Autoridad",
    }
}

vocabulary! {
    pub enum IncidentSeverity {
        Minor = "minor" | "Leve",
        Moderate = "moderate" | "Moderado",
        Serious = "serious" | "Grave",
        Critical = "critical" | "Crítico",
    }
}

impl SeverityScale for IncidentSeverity {}

vocabulary! {
    pub enum IncidentStatus {
        Reported = "reported" | "Reportado",
        InAttention = "in_attention" | "En atención",
        Escalated = "escalated" | "Escalado",
        Resolved = "resolved" | "Resuelto",
    }
}

vocabulary! {
    pub enum FindingKind {
        Environmental = "environmental" | "Ambiental",
        Fauna = "fauna" | "Fauna",
        Flora = "flora" | "Flora",
        Infrastructure = "infrastructure" | "Infraestructura",
    }
}

vocabulary! {
    pub enum FindingSeverity {
        Low = "low" | "Baja",
        Medium = "medium" | "Media",
        High = "high" | "Alta",
        Critical = "critical" | "Crítica",
    }
}

impl SeverityScale for FindingSeverity {}

vocabulary! {
    pub enum FindingStatus {
        Reported = "reported" | "Reportado",
        InInvestigation = "in_investigation" | "En investigación",
        InProcess = "in_process" | "En proceso",
        Resolved = "resolved" | "Resuelto",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IncidentCase;

impl CaseType for IncidentCase {
    const TABLE: &'static str = "incidents";
    const LABEL: &'static str = "Incident";

    type Kind = IncidentKind;
    type Severity = IncidentSeverity;
    type Status = IncidentStatus;

    fn policy() -> &'static TransitionPolicy<IncidentStatus> {
        &INCIDENT_POLICY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindingCase;

impl CaseType for FindingCase {
    const TABLE: &'static str = "findings";
    const LABEL: &'static str = "Finding";

    type Kind = FindingKind;
    type Severity = FindingSeverity;
    type Status = FindingStatus;

    fn policy() -> &'static TransitionPolicy<FindingStatus> {
        &FINDING_POLICY
    }
}

/// A field case. Incidents and findings share this shape; `T` picks the vocabularies and the
/// workflow.
///
/// Fields are public for reading. Status, `resolved_at` and the audit trail only change through
/// the lifecycle service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CaseRecord<T: CaseType> {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub kind: T::Kind,
    pub severity: T::Severity,
    pub status: T::Status,
    pub location: Location,
    pub reported_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub reported_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    pub involved_parties: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub audit_trail: AuditTrail,
}

pub type Incident = CaseRecord<IncidentCase>;
pub type Finding = CaseRecord<FindingCase>;

impl<T: CaseType> CaseRecord<T> {
    /// Text the console's free-text search runs against.
    pub fn search_haystack(&self) -> [Option<&str>; 3] {
        [
            Some(self.title.as_str()),
            Some(self.description.as_str()),
            self.location.place.as_deref(),
        ]
    }
}

impl<T: CaseType> Record for CaseRecord<T> {
    type Status = T::Status;

    const TABLE: &'static str = T::TABLE;
    const LABEL: &'static str = T::LABEL;

    fn policy() -> &'static TransitionPolicy<T::Status> {
        T::policy()
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn status(&self) -> T::Status {
        self.status
    }

    fn owner_id(&self) -> &str {
        &self.reported_by
    }

    fn audit_trail(&self) -> &AuditTrail {
        &self.audit_trail
    }

    fn audit_trail_mut(&mut self) -> &mut AuditTrail {
        &mut self.audit_trail
    }

    fn enter_status(&mut self, status: T::Status, at: OffsetDateTime) {
        self.status = status;
        if T::policy().is_terminal(status) && self.resolved_at.is_none() {
            self.resolved_at = Some(at);
        }
    }
}

impl WorkflowStatus for IncidentStatus {
    type Record = Incident;
}

impl WorkflowStatus for FindingStatus {
    type Record = Finding;
}
