//! Badge metadata for the console: one table per vocabulary instead of a switch per screen.

use serde::Serialize;

use crate::domain::{
    ActivityStatus, FindingSeverity, FindingStatus, IncidentSeverity, IncidentStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Info,
    Warning,
    Danger,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub tone: Tone,
}

pub trait BadgeMeta {
    fn badge(self) -> Badge;
}

const fn badge(label: &'static str, tone: Tone) -> Badge {
    Badge { label, tone }
}

impl BadgeMeta for IncidentStatus {
    fn badge(self) -> Badge {
        match self {
            IncidentStatus::Reported => badge("Reportado", Tone::Info),
            IncidentStatus::InAttention => badge("En atención", Tone::Warning),
            IncidentStatus::Escalated => badge("Escalado", Tone::Danger),
            IncidentStatus::Resolved => badge("Resuelto", Tone::Success),
        }
    }
}

impl BadgeMeta for FindingStatus {
    fn badge(self) -> Badge {
        match self {
            FindingStatus::Reported => badge("Reportado", Tone::Info),
            FindingStatus::InInvestigation => badge("En investigación", Tone::Warning),
            FindingStatus::InProcess => badge("En proceso", Tone::Warning),
            FindingStatus::Resolved => badge("Resuelto", Tone::Success),
        }
    }
}

impl BadgeMeta for ActivityStatus {
    fn badge(self) -> Badge {
        match self {
            ActivityStatus::Scheduled => badge("Programada", Tone::Info),
            ActivityStatus::InProgress => badge("En curso", Tone::Warning),
            ActivityStatus::Completed => badge("Completada", Tone::Success),
            ActivityStatus::Cancelled => badge("Cancelada", Tone::Neutral),
        }
    }
}

impl BadgeMeta for IncidentSeverity {
    fn badge(self) -> Badge {
        match self {
            IncidentSeverity::Minor => badge("Leve", Tone::Neutral),
            IncidentSeverity::Moderate => badge("Moderado", Tone::Info),
            IncidentSeverity::Serious => badge("Grave", Tone::Warning),
            IncidentSeverity::Critical => badge("Crítico", Tone::Danger),
        }
    }
}

impl BadgeMeta for FindingSeverity {
    fn badge(self) -> Badge {
        match self {
            FindingSeverity::Low => badge("Baja", Tone::Neutral),
            FindingSeverity::Medium => badge("Media", Tone::Info),
            FindingSeverity::High => badge("Alta", Tone::Warning),
            FindingSeverity::Critical => badge("Crítica", Tone::Danger),
        }
    }
}
