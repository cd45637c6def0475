use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    Activity, ActivityKind, ActivityStatus, CaseRecord, CaseType, Record, SeverityScale,
    Vocabulary,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketCount {
    pub key: String,
    pub count: i64,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseStatistics {
    pub total: i64,
    pub active: i64,
    pub resolved: i64,
    /// Upper two levels of the severity scale.
    pub high_severity: i64,
    pub critical: i64,
    /// Every status in workflow order, zero counts included.
    pub by_status: Vec<BucketCount>,
    pub by_kind: Vec<BucketCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityStatistics {
    pub total: i64,
    pub open: i64,
    pub patrols: i64,
    pub by_status: Vec<BucketCount>,
}

fn buckets<V: Vocabulary>(map: BTreeMap<V, Vec<i64>>) -> Vec<BucketCount> {
    V::ALL
        .iter()
        .map(|v| {
            let ids = map.get(v).cloned().unwrap_or_default();
            BucketCount {
                key: v.as_str().to_string(),
                count: ids.len() as i64,
                ids,
            }
        })
        .collect()
}

/// Counts over whatever case set the caller passes (normally the actor's visible set).
/// Recomputed on every call; nothing is kept between calls.
pub fn case_statistics<'a, T: CaseType>(
    cases: impl IntoIterator<Item = &'a CaseRecord<T>>,
) -> CaseStatistics {
    let mut total = 0;
    let mut resolved = 0;
    let mut high_severity = 0;
    let mut critical = 0;
    let mut by_status: BTreeMap<T::Status, Vec<i64>> = BTreeMap::new();
    let mut by_kind: BTreeMap<T::Kind, Vec<i64>> = BTreeMap::new();

    for case in cases {
        total += 1;
        if case.is_terminal() {
            resolved += 1;
        }
        if case.severity.is_high() {
            high_severity += 1;
        }
        if case.severity.is_critical() {
            critical += 1;
        }
        by_status.entry(case.status).or_default().push(case.id);
        by_kind.entry(case.kind).or_default().push(case.id);
    }

    CaseStatistics {
        total,
        active: total - resolved,
        resolved,
        high_severity,
        critical,
        by_status: buckets(by_status),
        by_kind: buckets(by_kind),
    }
}

pub fn activity_statistics<'a>(
    activities: impl IntoIterator<Item = &'a Activity>,
) -> ActivityStatistics {
    let mut total = 0;
    let mut open = 0;
    let mut patrols = 0;
    let mut by_status: BTreeMap<ActivityStatus, Vec<i64>> = BTreeMap::new();

    for a in activities {
        total += 1;
        if !a.is_terminal() {
            open += 1;
        }
        if a.kind == ActivityKind::Patrol {
            patrols += 1;
        }
        by_status.entry(a.status).or_default().push(a.id);
    }

    ActivityStatistics {
        total,
        open,
        patrols,
        by_status: buckets(by_status),
    }
}
