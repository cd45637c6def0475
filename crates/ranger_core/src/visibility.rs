use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{Activity, ActivityKind, ActivityStatus, Actor, CaseRecord, CaseType, Record};

/// Console-side narrowing of a case list. Every set field must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CaseFilter<T: CaseType> {
    #[serde(default)]
    pub kind: Option<T::Kind>,
    #[serde(default)]
    pub severity: Option<T::Severity>,
    #[serde(default)]
    pub status: Option<T::Status>,
    /// Inclusive lower bound on `reported_at`.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reported_from: Option<OffsetDateTime>,
    /// Inclusive upper bound on `reported_at`.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reported_to: Option<OffsetDateTime>,
    /// Case-insensitive substring over title, description and place.
    #[serde(default)]
    pub text: Option<String>,
}

impl<T: CaseType> Default for CaseFilter<T> {
    fn default() -> Self {
        Self {
            kind: None,
            severity: None,
            status: None,
            reported_from: None,
            reported_to: None,
            text: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityFilter {
    #[serde(default)]
    pub kind: Option<ActivityKind>,
    #[serde(default)]
    pub status: Option<ActivityStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_to: Option<OffsetDateTime>,
    #[serde(default)]
    pub text: Option<String>,
}

fn needle(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn any_contains<'a>(haystack: impl IntoIterator<Item = Option<&'a str>>, needle: &str) -> bool {
    haystack
        .into_iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(needle))
}

fn in_range(at: OffsetDateTime, from: Option<OffsetDateTime>, to: Option<OffsetDateTime>) -> bool {
    from.map_or(true, |f| at >= f) && to.map_or(true, |t| at <= t)
}

impl<T: CaseType> CaseFilter<T> {
    pub fn matches(&self, case: &CaseRecord<T>) -> bool {
        self.kind.map_or(true, |k| case.kind == k)
            && self.severity.map_or(true, |s| case.severity == s)
            && self.status.map_or(true, |s| case.status == s)
            && in_range(case.reported_at, self.reported_from, self.reported_to)
            && needle(&self.text).map_or(true, |n| any_contains(case.search_haystack(), &n))
    }
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        self.kind.map_or(true, |k| activity.kind == k)
            && self.status.map_or(true, |s| activity.status == s)
            && in_range(activity.scheduled_for, self.scheduled_from, self.scheduled_to)
            && needle(&self.text).map_or(true, |n| {
                any_contains([Some(activity.title.as_str()), activity.area.as_deref()], &n)
            })
    }
}

/// Field officers see only what they reported or are assigned; everyone else sees everything.
pub fn is_visible<R: Record>(actor: &Actor, record: &R) -> bool {
    !actor.is_field_scoped() || record.owner_id() == actor.id
}

pub fn scope_cases<'a, T: CaseType>(
    actor: &Actor,
    cases: &'a [CaseRecord<T>],
    filter: &CaseFilter<T>,
) -> Vec<&'a CaseRecord<T>> {
    cases
        .iter()
        .filter(|c| is_visible(actor, *c) && filter.matches(c))
        .collect()
}

pub fn scope_activities<'a>(
    actor: &Actor,
    activities: &'a [Activity],
    filter: &ActivityFilter,
) -> Vec<&'a Activity> {
    activities
        .iter()
        .filter(|a| is_visible(actor, *a) && filter.matches(a))
        .collect()
}
