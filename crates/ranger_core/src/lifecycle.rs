//! The only place records are created or mutated.
//!
//! Every operation loads the record from the store, works on that copy, and persists it with a
//! single write. Rejected operations never reach the store, and a failed write leaves the
//! store's copy as it was.

use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use time::OffsetDateTime;

use crate::audit::AuditTrail;
use crate::catalog::Catalog;
use crate::clock::{Clock, SystemClock};
use crate::collection::CaseCollection;
use crate::config::LifecycleConfig;
use crate::domain::{
    Activity, ActivityDraft, ActivityPatch, ActivityStatus, Actor, CaseDraft, CasePatch,
    CaseRecord, CaseType, EvidenceDraft, Finding, FindingCase, Record, WorkflowStatus,
};
use crate::error::{
    AppError, FieldError, ACCESS_DENIED, LOCKED, PATROL_SESSION_STATE, TERMINAL,
};
use crate::patrol::DraftId;
use crate::policy::{apply_transition, TransitionCheck};
use crate::store::CaseStore;
use crate::validate::{
    check_evidence, check_location, check_parties, check_text,
    validate_activity_draft, validate_case_draft,
};

pub const INITIAL_REPORT: &str = "Initial report";
pub const REPORT_UPDATED: &str = "Report updated";
pub const ACTIVITY_SCHEDULED: &str = "Activity scheduled";

/// Result of an operation that may legitimately have nothing to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<R> {
    Applied(R),
    /// The request matched the current state; nothing was recorded.
    NoChange,
}

impl<R> Outcome<R> {
    pub fn applied(self) -> Option<R> {
        match self {
            Outcome::Applied(r) => Some(r),
            Outcome::NoChange => None,
        }
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Outcome::NoChange)
    }
}

/// Field officers may only act on records they own (reported or are assigned to).
fn ensure_can_act_on<R: Record>(record: &R, actor: &Actor) -> Result<(), AppError> {
    if actor.is_field_scoped() && record.owner_id() != actor.id {
        return Err(AppError::new(
            ACCESS_DENIED,
            format!("{} belongs to another ranger", R::LABEL),
        )
        .with_details(format!("id={}; actor={}", record.id(), actor.id)));
    }
    Ok(())
}

fn ensure_can_schedule(actor: &Actor) -> Result<(), AppError> {
    if actor.is_field_scoped() {
        return Err(AppError::new(
            ACCESS_DENIED,
            "Only supervisors can schedule or edit activities",
        )
        .with_details(format!("actor={}", actor.id)));
    }
    Ok(())
}

fn ensure_editable<R: Record>(record: &R) -> Result<(), AppError> {
    if !R::policy().is_editable(record.status()) {
        return Err(AppError::new(
            LOCKED,
            format!("{} can no longer be edited", R::LABEL),
        )
        .with_details(format!("id={}; status={}", record.id(), record.status())));
    }
    Ok(())
}

fn prefixed(prefix: &str, errors: Vec<FieldError>) -> impl Iterator<Item = FieldError> + '_ {
    errors
        .into_iter()
        .map(move |e| FieldError::new(format!("{prefix}.{}", e.field), e.message))
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub struct CaseLifecycleService<S, C = SystemClock> {
    store: S,
    clock: C,
    catalog: Catalog,
    config: LifecycleConfig,
    /// One slot per patrol; a slot is taken while its lease is alive.
    open_patrols: BTreeMap<i64, Weak<()>>,
}

impl<S: CaseStore> CaseLifecycleService<S, SystemClock> {
    pub fn new(store: S, catalog: Catalog) -> Self {
        Self::with_clock(store, SystemClock, catalog, LifecycleConfig::default())
    }
}

impl<S: CaseStore, C: Clock> CaseLifecycleService<S, C> {
    pub fn with_clock(store: S, clock: C, catalog: Catalog, config: LifecycleConfig) -> Self {
        Self {
            store,
            clock,
            catalog,
            config,
            open_patrols: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    fn persist<R: Record>(&mut self, record: &R) -> Result<(), AppError> {
        self.store.save(record).map_err(|e| {
            tracing::warn!(record = R::TABLE, id = record.id(), code = %e.code, "write failed");
            AppError::remote_failure(e)
        })
    }

    pub fn get<R: Record>(&self, id: i64) -> Result<R, AppError> {
        self.store.get(id)
    }

    /// Full reload of everything the console displays.
    pub fn reload(&self) -> Result<CaseCollection, AppError> {
        CaseCollection::load(&self.store)
    }

    /// Reload scoped to what `actor` may see.
    pub fn reload_for(&self, actor: &Actor) -> Result<CaseCollection, AppError> {
        CaseCollection::load_for(&self.store, actor)
    }

    /// Open a new case in its workflow's initial status.
    pub fn create<T: CaseType>(
        &mut self,
        draft: &CaseDraft<T>,
        actor: &Actor,
    ) -> Result<CaseRecord<T>, AppError> {
        let now = self.now();
        let valid = validate_case_draft(draft, &self.config, now).map_err(|errors| {
            tracing::warn!(record = T::TABLE, actor = %actor.id, errors = errors.len(), "rejected draft");
            AppError::validation(errors)
        })?;

        let record = CaseRecord::<T> {
            id: 0,
            title: valid.title,
            description: valid.description,
            kind: valid.kind,
            severity: valid.severity,
            status: T::policy().initial(),
            location: valid.location,
            reported_by: actor.id.clone(),
            reported_at: now,
            resolved_at: None,
            involved_parties: valid.involved_parties,
            evidence: valid.evidence,
            audit_trail: AuditTrail::seed(now, INITIAL_REPORT, actor.id.clone(), None),
        };

        let stored = self
            .store
            .insert(record)
            .map_err(AppError::remote_failure)?;
        tracing::info!(record = T::TABLE, id = stored.id, actor = %actor.id, severity = %stored.severity, "case reported");
        Ok(stored)
    }

    /// Edit descriptive fields while the workflow still allows it.
    pub fn update<T: CaseType>(
        &mut self,
        id: i64,
        patch: &CasePatch<T>,
        actor: &Actor,
    ) -> Result<Outcome<CaseRecord<T>>, AppError> {
        let mut record: CaseRecord<T> = self.store.get(id)?;
        ensure_can_act_on(&record, actor)?;
        ensure_editable(&record)?;

        let mut errors = Vec::new();
        let mut changed: Vec<&str> = Vec::new();

        if let Some(title) = &patch.title {
            if let Some(t) = check_text("title", title, Some(self.config.title_max_chars), &mut errors) {
                if t != record.title {
                    record.title = t;
                    changed.push("title");
                }
            }
        }
        if let Some(description) = &patch.description {
            if let Some(d) = check_text("description", description, None, &mut errors) {
                if d != record.description {
                    record.description = d;
                    changed.push("description");
                }
            }
        }
        if let Some(kind) = patch.kind {
            if kind != record.kind {
                record.kind = kind;
                changed.push("kind");
            }
        }
        if let Some(severity) = patch.severity {
            if severity != record.severity {
                record.severity = severity;
                changed.push("severity");
            }
        }
        if let Some(location) = &patch.location {
            if let Some(l) = check_location(location, &mut errors) {
                if l != record.location {
                    record.location = l;
                    changed.push("location");
                }
            }
        }
        if let Some(parties) = &patch.involved_parties {
            let parties = check_parties(parties, &self.config, &mut errors);
            if parties != record.involved_parties {
                record.involved_parties = parties;
                changed.push("involved_parties");
            }
        }

        if !errors.is_empty() {
            return Err(AppError::validation(errors));
        }
        if changed.is_empty() {
            tracing::debug!(record = T::TABLE, id, "update with no changes");
            return Ok(Outcome::NoChange);
        }

        let now = self.now();
        record.audit_trail.append(
            now,
            REPORT_UPDATED,
            actor.id.clone(),
            Some(format!("changed: {}", changed.join(", "))),
        );
        self.persist(&record)?;
        tracing::info!(record = T::TABLE, id, actor = %actor.id, fields = %changed.join(","), "case updated");
        Ok(Outcome::Applied(record))
    }

    /// Log an action against a record without moving its status.
    pub fn append_follow_up<R: Record>(
        &mut self,
        id: i64,
        action: &str,
        notes: Option<&str>,
        actor: &Actor,
    ) -> Result<R, AppError> {
        let mut record: R = self.store.get(id)?;
        ensure_can_act_on(&record, actor)?;
        if record.is_terminal() {
            return Err(AppError::new(
                TERMINAL,
                format!("{} is closed; follow-ups are not accepted", R::LABEL),
            )
            .with_details(format!("id={id}; status={}", record.status())));
        }
        let mut errors = Vec::new();
        let Some(action) = check_text("action", action, Some(self.config.title_max_chars), &mut errors)
        else {
            return Err(AppError::validation(errors));
        };

        let now = self.now();
        record
            .audit_trail_mut()
            .append(now, action, actor.id.clone(), non_blank(notes));
        self.persist(&record)?;
        tracing::info!(record = R::TABLE, id, actor = %actor.id, "follow-up recorded");
        Ok(record)
    }

    /// Move a record along its workflow. The status value picks the record family.
    pub fn change_status<St: WorkflowStatus>(
        &mut self,
        id: i64,
        target: St,
        actor: &Actor,
        notes: Option<&str>,
    ) -> Result<Outcome<St::Record>, AppError> {
        let table = <St::Record as Record>::TABLE;
        let mut record: St::Record = self.store.get(id)?;
        ensure_can_act_on(&record, actor)?;
        let from = record.status();
        if record.held_by_session() && target != from {
            tracing::warn!(record = table, id, from = %from, to = %target, "status held by patrol session");
            return Err(AppError::new(
                PATROL_SESSION_STATE,
                "Patrol in progress can only be closed by finishing its session",
            )
            .with_details(format!("id={id}; status={from}")));
        }
        let now = self.now();

        match apply_transition(&mut record, target, &actor.id, notes, now) {
            Ok(TransitionCheck::NoChange) => {
                tracing::debug!(record = table, id, status = %from, "already in requested status");
                Ok(Outcome::NoChange)
            }
            Ok(TransitionCheck::Allowed) => {
                self.persist(&record)?;
                tracing::info!(record = table, id, from = %from, to = %target, actor = %actor.id, "status changed");
                Ok(Outcome::Applied(record))
            }
            Err(e) => {
                tracing::warn!(record = table, id, from = %from, to = %target, code = %e.code, "transition rejected");
                Err(e)
            }
        }
    }

    pub fn create_activity(
        &mut self,
        draft: &ActivityDraft,
        actor: &Actor,
    ) -> Result<Activity, AppError> {
        ensure_can_schedule(actor)?;
        let catalog = &self.catalog;
        let valid = validate_activity_draft(draft, &self.config, |id| catalog.is_assignable(id))
            .map_err(AppError::validation)?;

        let now = self.now();
        let activity = Activity {
            id: 0,
            title: valid.title,
            kind: valid.kind,
            area: valid.area,
            assigned_to: valid.assigned_to,
            created_by: actor.id.clone(),
            scheduled_for: valid.scheduled_for,
            status: Activity::policy().initial(),
            started_at: None,
            closed_at: None,
            notes: Vec::new(),
            evidence: Vec::new(),
            audit_trail: AuditTrail::seed(now, ACTIVITY_SCHEDULED, actor.id.clone(), None),
        };
        let stored = self
            .store
            .insert(activity)
            .map_err(AppError::remote_failure)?;
        tracing::info!(record = Activity::TABLE, id = stored.id, assigned_to = %stored.assigned_to, kind = %stored.kind, "activity scheduled");
        Ok(stored)
    }

    /// Scheduled activities can be edited; once started they are locked.
    pub fn update_activity(
        &mut self,
        id: i64,
        patch: &ActivityPatch,
        actor: &Actor,
    ) -> Result<Outcome<Activity>, AppError> {
        ensure_can_schedule(actor)?;
        let mut activity: Activity = self.store.get(id)?;
        ensure_editable(&activity)?;

        let mut errors = Vec::new();
        let mut changed: Vec<&str> = Vec::new();

        if let Some(title) = &patch.title {
            if let Some(t) = check_text("title", title, Some(self.config.title_max_chars), &mut errors) {
                if t != activity.title {
                    activity.title = t;
                    changed.push("title");
                }
            }
        }
        if let Some(kind) = patch.kind {
            if kind != activity.kind {
                activity.kind = kind;
                changed.push("kind");
            }
        }
        if let Some(area) = &patch.area {
            let area = non_blank(Some(area.as_str()));
            if area != activity.area {
                activity.area = area;
                changed.push("area");
            }
        }
        if let Some(assignee) = &patch.assigned_to {
            if let Some(a) = check_text("assigned_to", assignee, None, &mut errors) {
                if !self.catalog.is_assignable(&a) {
                    errors.push(FieldError::new("assigned_to", "is not an assignable ranger"));
                } else if a != activity.assigned_to {
                    activity.assigned_to = a;
                    changed.push("assigned_to");
                }
            }
        }
        if let Some(when) = patch.scheduled_for {
            if when != activity.scheduled_for {
                activity.scheduled_for = when;
                changed.push("scheduled_for");
            }
        }

        if !errors.is_empty() {
            return Err(AppError::validation(errors));
        }
        if changed.is_empty() {
            return Ok(Outcome::NoChange);
        }

        let now = self.now();
        activity.audit_trail.append(
            now,
            REPORT_UPDATED,
            actor.id.clone(),
            Some(format!("changed: {}", changed.join(", "))),
        );
        self.persist(&activity)?;
        tracing::info!(record = Activity::TABLE, id, actor = %actor.id, fields = %changed.join(","), "activity updated");
        Ok(Outcome::Applied(activity))
    }

    /// Activities are never deleted; cancelling is a status change like any other.
    pub fn cancel_activity(
        &mut self,
        id: i64,
        actor: &Actor,
        notes: Option<&str>,
    ) -> Result<Outcome<Activity>, AppError> {
        self.change_status(id, ActivityStatus::Cancelled, actor, notes)
    }

    /// Take the open-session slot of a patrol. The slot frees itself when the lease is dropped.
    pub(crate) fn claim_patrol(&mut self, activity_id: i64) -> Result<Rc<()>, AppError> {
        if self
            .open_patrols
            .get(&activity_id)
            .is_some_and(|held| held.strong_count() > 0)
        {
            return Err(AppError::new(
                PATROL_SESSION_STATE,
                "Patrol already has an open session",
            )
            .with_details(format!("activity={activity_id}")));
        }
        let lease = Rc::new(());
        self.open_patrols.insert(activity_id, Rc::downgrade(&lease));
        Ok(lease)
    }

    /// Commit a patrol: every drafted finding plus the activity's completion, in one store call.
    ///
    /// All drafts are validated before anything is written; the error lists every problem,
    /// prefixed `findings[<draft id>]` or `evidence`.
    pub(crate) fn commit_patrol(
        &mut self,
        activity_id: i64,
        findings: &[(DraftId, CaseDraft<FindingCase>)],
        evidence: &[EvidenceDraft],
        notes: &[String],
        actor: &Actor,
    ) -> Result<(Activity, Vec<Finding>), AppError> {
        let mut activity: Activity = self.store.get(activity_id)?;
        ensure_can_act_on(&activity, actor)?;
        let now = self.now();

        let mut errors = Vec::new();
        let mut records = Vec::with_capacity(findings.len());
        for (draft_id, draft) in findings {
            match validate_case_draft(draft, &self.config, now) {
                Ok(valid) => records.push(Finding {
                    id: 0,
                    title: valid.title,
                    description: valid.description,
                    kind: valid.kind,
                    severity: valid.severity,
                    status: FindingCase::policy().initial(),
                    location: valid.location,
                    reported_by: actor.id.clone(),
                    reported_at: now,
                    resolved_at: None,
                    involved_parties: valid.involved_parties,
                    evidence: valid.evidence,
                    audit_trail: AuditTrail::seed(
                        now,
                        INITIAL_REPORT,
                        actor.id.clone(),
                        Some(format!("Reported during activity {activity_id}")),
                    ),
                }),
                Err(errs) => errors.extend(prefixed(&format!("findings[{draft_id}]"), errs)),
            }
        }
        let general = check_evidence(
            "evidence",
            evidence,
            &activity.evidence,
            &self.config,
            now,
            &mut errors,
        );
        if !errors.is_empty() {
            tracing::warn!(activity = activity_id, errors = errors.len(), "patrol drafts rejected");
            return Err(AppError::validation(errors));
        }

        let closing_notes: Vec<String> = notes.iter().filter_map(|n| non_blank(Some(n.as_str()))).collect();
        let summary = format!(
            "Patrol finished with {} finding(s) and {} attachment(s)",
            records.len(),
            general.len()
        );
        apply_transition(
            &mut activity,
            ActivityStatus::Completed,
            &actor.id,
            Some(&summary),
            now,
        )
        .and_then(|check| match check {
            TransitionCheck::Allowed => Ok(()),
            TransitionCheck::NoChange => Err(AppError::new(
                TERMINAL,
                "Activity is already completed",
            )),
        })?;
        activity.evidence.extend(general);
        activity.notes.extend(closing_notes);

        let committed = self
            .store
            .commit_patrol(records, &activity)
            .map_err(|e| {
                tracing::warn!(activity = activity_id, code = %e.code, "patrol commit failed");
                AppError::remote_failure(e)
            })?;
        tracing::info!(activity = activity_id, findings = committed.len(), actor = %actor.id, "patrol finished");
        Ok((activity, committed))
    }
}
