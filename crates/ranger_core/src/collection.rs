use serde::{Deserialize, Serialize};

use crate::domain::{Activity, Actor, Finding, FindingCase, Incident, IncidentCase};
use crate::error::AppError;
use crate::stats::{activity_statistics, case_statistics, ActivityStatistics, CaseStatistics};
use crate::store::CaseStore;
use crate::visibility::{scope_activities, scope_cases, ActivityFilter, CaseFilter};

pub const DASHBOARD_PAYLOAD_VERSION: u32 = 1;

/// Snapshot of the source of truth as last loaded. Never patched in place: after any write the
/// console replaces it with a fresh [`CaseCollection::load`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseCollection {
    pub incidents: Vec<Incident>,
    pub findings: Vec<Finding>,
    pub activities: Vec<Activity>,
}

/// Filters for one console screen render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleFilters {
    #[serde(default)]
    pub incidents: CaseFilter<IncidentCase>,
    #[serde(default)]
    pub findings: CaseFilter<FindingCase>,
    #[serde(default)]
    pub activities: ActivityFilter,
}

/// Everything one actor is allowed to see, plus the counters derived from exactly that set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardPayload<'a> {
    pub version: u32,
    pub incidents: Vec<&'a Incident>,
    pub findings: Vec<&'a Finding>,
    pub activities: Vec<&'a Activity>,
    pub incident_stats: CaseStatistics,
    pub finding_stats: CaseStatistics,
    pub activity_stats: ActivityStatistics,
}

impl CaseCollection {
    pub fn load<S: CaseStore>(store: &S) -> Result<Self, AppError> {
        Ok(Self {
            incidents: store.load_all()?,
            findings: store.load_all()?,
            activities: store.load_all()?,
        })
    }

    /// Only what `actor` may see. Field officers get their own rows straight from the store.
    pub fn load_for<S: CaseStore>(store: &S, actor: &Actor) -> Result<Self, AppError> {
        if !actor.is_field_scoped() {
            return Self::load(store);
        }
        Ok(Self {
            incidents: store.load_owned(&actor.id)?,
            findings: store.load_owned(&actor.id)?,
            activities: store.load_owned(&actor.id)?,
        })
    }

    pub fn dashboard<'a>(&'a self, actor: &Actor, filters: &ConsoleFilters) -> DashboardPayload<'a> {
        let incidents = scope_cases(actor, &self.incidents, &filters.incidents);
        let findings = scope_cases(actor, &self.findings, &filters.findings);
        let activities = scope_activities(actor, &self.activities, &filters.activities);

        DashboardPayload {
            version: DASHBOARD_PAYLOAD_VERSION,
            incident_stats: case_statistics(incidents.iter().copied()),
            finding_stats: case_statistics(findings.iter().copied()),
            activity_stats: activity_statistics(activities.iter().copied()),
            incidents,
            findings,
            activities,
        }
    }
}
