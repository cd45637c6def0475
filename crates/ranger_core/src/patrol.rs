//! Patrol sessions: the span between starting a patrol activity and finishing it, during which
//! findings and evidence are drafted but nothing is committed.
//!
//! An open session can only be released through [`PatrolSession::finish`]. There is no abandon
//! path; drafts live only in memory until then. While a patrol is in progress its activity cannot
//! be completed or cancelled any other way, and at most one live session exists per patrol.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::domain::{
    Activity, ActivityStatus, Actor, CaseDraft, EvidenceDraft, Finding, FindingCase,
};
use crate::error::{AppError, FieldError, PATROL_SESSION_STATE};
use crate::lifecycle::{CaseLifecycleService, Outcome};
use crate::store::CaseStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatrolState {
    NotStarted,
    Open,
    Finished,
}

/// Handle for one drafted item, unique within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DraftId(u32);

impl DraftId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a finished patrol produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PatrolReport {
    pub activity: Activity,
    pub findings: Vec<Finding>,
}

#[derive(Debug)]
pub struct PatrolSession {
    activity_id: i64,
    state: PatrolState,
    ranger: Option<Actor>,
    lease: Option<Rc<()>>,
    next_draft: u32,
    findings: Vec<(DraftId, CaseDraft<FindingCase>)>,
    evidence: Vec<(DraftId, EvidenceDraft)>,
    notes: Vec<String>,
}

impl PatrolSession {
    pub fn new(activity_id: i64) -> Self {
        Self {
            activity_id,
            state: PatrolState::NotStarted,
            ranger: None,
            lease: None,
            next_draft: 1,
            findings: Vec::new(),
            evidence: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn activity_id(&self) -> i64 {
        self.activity_id
    }

    pub fn state(&self) -> PatrolState {
        self.state
    }

    pub fn drafted_findings(&self) -> &[(DraftId, CaseDraft<FindingCase>)] {
        &self.findings
    }

    pub fn drafted_evidence(&self) -> &[(DraftId, EvidenceDraft)] {
        &self.evidence
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    fn require(&self, expected: PatrolState, op: &str) -> Result<(), AppError> {
        if self.state != expected {
            return Err(AppError::new(
                PATROL_SESSION_STATE,
                format!("Cannot {op}: patrol session is {:?}", self.state),
            )
            .with_details(format!("activity={}", self.activity_id)));
        }
        Ok(())
    }

    fn load_patrol<S: CaseStore, C: Clock>(
        &self,
        service: &CaseLifecycleService<S, C>,
    ) -> Result<Activity, AppError> {
        let activity: Activity = service.get(self.activity_id)?;
        if !activity.is_patrol() {
            return Err(AppError::validation(vec![FieldError::new(
                "kind",
                format!("activity is a {} activity, not a patrol", activity.kind),
            )]));
        }
        Ok(activity)
    }

    fn allocate(&mut self) -> DraftId {
        let id = DraftId(self.next_draft);
        self.next_draft += 1;
        id
    }

    /// Start the patrol: the activity moves `Scheduled → InProgress` and the session opens.
    pub fn start<S: CaseStore, C: Clock>(
        &mut self,
        service: &mut CaseLifecycleService<S, C>,
        ranger: &Actor,
    ) -> Result<Activity, AppError> {
        self.require(PatrolState::NotStarted, "start")?;
        let activity = self.load_patrol(service)?;
        if activity.status != ActivityStatus::Scheduled {
            return Err(AppError::new(
                PATROL_SESSION_STATE,
                format!("Patrol cannot start from status {}", activity.status),
            )
            .with_details(format!("activity={}", self.activity_id)));
        }

        let lease = service.claim_patrol(self.activity_id)?;
        let activity = match service.change_status(
            self.activity_id,
            ActivityStatus::InProgress,
            ranger,
            Some("Patrol started"),
        )? {
            Outcome::Applied(a) => a,
            Outcome::NoChange => activity,
        };
        self.state = PatrolState::Open;
        self.ranger = Some(ranger.clone());
        self.lease = Some(lease);
        tracing::info!(activity = self.activity_id, ranger = %ranger.id, "patrol session opened");
        Ok(activity)
    }

    /// Reopen a session for a patrol already `InProgress` (e.g. after the console was closed
    /// mid-patrol). Drafts from the lost session are not recoverable, and a session that is
    /// still alive blocks the resume.
    pub fn resume<S: CaseStore, C: Clock>(
        &mut self,
        service: &mut CaseLifecycleService<S, C>,
        ranger: &Actor,
    ) -> Result<Activity, AppError> {
        self.require(PatrolState::NotStarted, "resume")?;
        let activity = self.load_patrol(service)?;
        if activity.status != ActivityStatus::InProgress {
            return Err(AppError::new(
                PATROL_SESSION_STATE,
                format!("Only a patrol in progress can be resumed (status {})", activity.status),
            )
            .with_details(format!("activity={}", self.activity_id)));
        }
        if ranger.is_field_scoped() && activity.assigned_to != ranger.id {
            return Err(AppError::new(
                crate::error::ACCESS_DENIED,
                "Patrol is assigned to another ranger",
            ));
        }
        let lease = service.claim_patrol(self.activity_id)?;
        self.state = PatrolState::Open;
        self.ranger = Some(ranger.clone());
        self.lease = Some(lease);
        tracing::info!(activity = self.activity_id, ranger = %ranger.id, "patrol session resumed");
        Ok(activity)
    }

    /// Buffer a finding. Nothing is validated or written until [`PatrolSession::finish`].
    pub fn draft_finding<S: CaseStore, C: Clock>(
        &mut self,
        service: &CaseLifecycleService<S, C>,
        draft: CaseDraft<FindingCase>,
    ) -> Result<DraftId, AppError> {
        self.require(PatrolState::Open, "draft a finding")?;
        let max = service.config().max_draft_findings;
        if self.findings.len() >= max {
            return Err(AppError::validation(vec![FieldError::new(
                "findings",
                format!("at most {max} findings per patrol"),
            )]));
        }
        let id = self.allocate();
        self.findings.push((id, draft));
        Ok(id)
    }

    pub fn draft_evidence<S: CaseStore, C: Clock>(
        &mut self,
        service: &CaseLifecycleService<S, C>,
        draft: EvidenceDraft,
    ) -> Result<DraftId, AppError> {
        self.require(PatrolState::Open, "draft evidence")?;
        let max = service.config().max_evidence_per_case;
        if self.evidence.len() >= max {
            return Err(AppError::validation(vec![FieldError::new(
                "evidence",
                format!("at most {max} attachments"),
            )]));
        }
        let id = self.allocate();
        self.evidence.push((id, draft));
        Ok(id)
    }

    pub fn add_note(&mut self, note: impl Into<String>) -> Result<(), AppError> {
        self.require(PatrolState::Open, "add a note")?;
        self.notes.push(note.into());
        Ok(())
    }

    pub fn remove_draft_finding(&mut self, id: DraftId) -> Result<CaseDraft<FindingCase>, AppError> {
        self.require(PatrolState::Open, "remove a draft finding")?;
        let pos = self
            .findings
            .iter()
            .position(|(d, _)| *d == id)
            .ok_or_else(|| draft_not_found("finding", id))?;
        Ok(self.findings.remove(pos).1)
    }

    pub fn remove_draft_evidence(&mut self, id: DraftId) -> Result<EvidenceDraft, AppError> {
        self.require(PatrolState::Open, "remove draft evidence")?;
        let pos = self
            .evidence
            .iter()
            .position(|(d, _)| *d == id)
            .ok_or_else(|| draft_not_found("evidence", id))?;
        Ok(self.evidence.remove(pos).1)
    }

    /// Commit everything drafted and complete the activity.
    ///
    /// All-or-nothing: if any draft is invalid (or the write fails) nothing is committed, the
    /// activity stays `InProgress`, and the session stays open with its drafts for correction.
    pub fn finish<S: CaseStore, C: Clock>(
        &mut self,
        service: &mut CaseLifecycleService<S, C>,
        notes: Option<&str>,
    ) -> Result<PatrolReport, AppError> {
        self.require(PatrolState::Open, "finish")?;
        let Some(ranger) = self.ranger.clone() else {
            return Err(AppError::new(
                PATROL_SESSION_STATE,
                "Patrol session has no ranger",
            ));
        };

        let mut all_notes = self.notes.clone();
        if let Some(n) = notes {
            all_notes.push(n.to_string());
        }
        let evidence: Vec<EvidenceDraft> = self.evidence.iter().map(|(_, e)| e.clone()).collect();

        let (activity, findings) = service.commit_patrol(
            self.activity_id,
            &self.findings,
            &evidence,
            &all_notes,
            &ranger,
        )?;

        self.state = PatrolState::Finished;
        self.lease = None;
        self.findings.clear();
        self.evidence.clear();
        self.notes.clear();
        Ok(PatrolReport { activity, findings })
    }
}

fn draft_not_found(what: &str, id: DraftId) -> AppError {
    AppError::new(crate::error::NOT_FOUND, format!("No draft {what} with id {id}"))
}

impl Drop for PatrolSession {
    fn drop(&mut self) {
        if self.state == PatrolState::Open {
            tracing::warn!(
                activity = self.activity_id,
                findings = self.findings.len(),
                evidence = self.evidence.len(),
                "open patrol session dropped; drafts discarded"
            );
        }
    }
}
