//! Status workflows. Each record family owns one adjacency table; the checking code below is
//! shared by all of them.

use time::OffsetDateTime;

use crate::domain::vocab::Vocabulary;
use crate::domain::{ActivityStatus, FindingStatus, IncidentStatus, Record};
use crate::error::{AppError, INVALID_TRANSITION, TERMINAL};

/// Legal status changes for one workflow.
#[derive(Debug)]
pub struct TransitionPolicy<S: 'static> {
    name: &'static str,
    initial: S,
    edges: &'static [(S, &'static [S])],
    editable: &'static [S],
}

/// Result of checking a requested change that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    Allowed,
    /// The record is already in the requested status; nothing should be recorded.
    NoChange,
}

impl<S: Vocabulary> TransitionPolicy<S> {
    pub const fn new(
        name: &'static str,
        initial: S,
        edges: &'static [(S, &'static [S])],
        editable: &'static [S],
    ) -> Self {
        Self {
            name,
            initial,
            edges,
            editable,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn initial(&self) -> S {
        self.initial
    }

    /// Statuses reachable in one step from `from`, in table order.
    pub fn targets(&self, from: S) -> &'static [S] {
        self.edges
            .iter()
            .find(|(s, _)| *s == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    /// Pure adjacency lookup. A status never transitions to itself.
    pub fn can_transition(&self, from: S, to: S) -> bool {
        from != to && self.targets(from).contains(&to)
    }

    pub fn is_terminal(&self, status: S) -> bool {
        self.targets(status).is_empty()
    }

    /// Whether descriptive fields may still be edited in `status`.
    pub fn is_editable(&self, status: S) -> bool {
        self.editable.contains(&status)
    }

    pub fn check(&self, from: S, to: S) -> Result<TransitionCheck, AppError> {
        if from == to {
            return Ok(TransitionCheck::NoChange);
        }
        if self.is_terminal(from) {
            return Err(AppError::new(
                TERMINAL,
                format!("{} is closed in status {from}", self.name),
            )
            .with_details(format!("from={from}; to={to}")));
        }
        if !self.can_transition(from, to) {
            let allowed = self
                .targets(from)
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppError::new(
                INVALID_TRANSITION,
                format!("{} cannot move from {from} to {to}", self.name),
            )
            .with_details(format!("from={from}; to={to}; allowed=[{allowed}]")));
        }
        Ok(TransitionCheck::Allowed)
    }
}

pub static INCIDENT_POLICY: TransitionPolicy<IncidentStatus> = TransitionPolicy::new(
    "Incident",
    IncidentStatus::Reported,
    &[
        (
            IncidentStatus::Reported,
            &[IncidentStatus::InAttention, IncidentStatus::Escalated],
        ),
        (
            IncidentStatus::InAttention,
            &[IncidentStatus::Escalated, IncidentStatus::Resolved],
        ),
        (
            IncidentStatus::Escalated,
            &[IncidentStatus::InAttention, IncidentStatus::Resolved],
        ),
        (IncidentStatus::Resolved, &[]),
    ],
    &[
        IncidentStatus::Reported,
        IncidentStatus::InAttention,
        IncidentStatus::Escalated,
    ],
);

pub static FINDING_POLICY: TransitionPolicy<FindingStatus> = TransitionPolicy::new(
    "Finding",
    FindingStatus::Reported,
    &[
        (FindingStatus::Reported, &[FindingStatus::InInvestigation]),
        (FindingStatus::InInvestigation, &[FindingStatus::InProcess]),
        (FindingStatus::InProcess, &[FindingStatus::Resolved]),
        (FindingStatus::Resolved, &[]),
    ],
    &[
        FindingStatus::Reported,
        FindingStatus::InInvestigation,
        FindingStatus::InProcess,
    ],
);

pub static ACTIVITY_POLICY: TransitionPolicy<ActivityStatus> = TransitionPolicy::new(
    "Activity",
    ActivityStatus::Scheduled,
    &[
        (
            ActivityStatus::Scheduled,
            &[ActivityStatus::InProgress, ActivityStatus::Cancelled],
        ),
        (
            ActivityStatus::InProgress,
            &[ActivityStatus::Completed, ActivityStatus::Cancelled],
        ),
        (ActivityStatus::Completed, &[]),
        (ActivityStatus::Cancelled, &[]),
    ],
    &[ActivityStatus::Scheduled],
);

/// Move `record` to `target` and log it.
///
/// On `Err` or `NoChange` the record is untouched. On success exactly one audit entry is
/// appended: `"Status change to <target>"` with `note`, or `"<from> → <target>"` when no note
/// was given.
pub fn apply_transition<R: Record>(
    record: &mut R,
    target: R::Status,
    actor: &str,
    note: Option<&str>,
    now: OffsetDateTime,
) -> Result<TransitionCheck, AppError> {
    let from = record.status();
    match R::policy().check(from, target)? {
        TransitionCheck::NoChange => Ok(TransitionCheck::NoChange),
        TransitionCheck::Allowed => {
            let notes = match note.map(str::trim).filter(|n| !n.is_empty()) {
                Some(n) => n.to_string(),
                None => format!("{from} → {target}"),
            };
            record.enter_status(target, now);
            record.audit_trail_mut().append(
                now,
                format!("Status change to {target}"),
                actor,
                Some(notes),
            );
            Ok(TransitionCheck::Allowed)
        }
    }
}
