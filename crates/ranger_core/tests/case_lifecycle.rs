use pretty_assertions::assert_eq;
use time::{Duration, OffsetDateTime};

use ranger_core::catalog::Catalog;
use ranger_core::clock::{Clock, ManualClock};
use ranger_core::config::LifecycleConfig;
use ranger_core::domain::{
    Activity, ActivityDraft, ActivityKind, ActivityPatch, ActivityStatus, Actor, CaseDraft,
    Finding, FindingCase, FindingKind, FindingSeverity, FindingStatus, Incident, IncidentCase,
    IncidentKind, IncidentSeverity, IncidentStatus, LocationInput, Record, Role, Vocabulary,
};
use ranger_core::error::{
    ACCESS_DENIED, INVALID_TRANSITION, LOCKED, NOT_FOUND, REMOTE_FAILURE, TERMINAL,
    VALIDATION_FAILED,
};
use ranger_core::lifecycle::{CaseLifecycleService, Outcome, INITIAL_REPORT};
use ranger_core::store::{CaseStore, InMemoryCaseStore};

type Service<'c> = CaseLifecycleService<InMemoryCaseStore, &'c ManualClock>;

fn start() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap()
}

fn ranger() -> Actor {
    Actor::new("ranger-a", "Ana Quispe", Role::FieldOfficer)
}

fn supervisor() -> Actor {
    Actor::new("sup-1", "Carlos Rojas", Role::Supervisor)
}

fn service(clock: &ManualClock) -> Service<'_> {
    CaseLifecycleService::with_clock(
        InMemoryCaseStore::new(),
        clock,
        Catalog::new([ranger(), supervisor()]),
        LifecycleConfig::default(),
    )
}

fn tourist_incident() -> CaseDraft<IncidentCase> {
    CaseDraft::new(
        "Turista herido en sendero",
        "Caída en el tramo de piedras sueltas",
        IncidentKind::parse("Turista").unwrap(),
        IncidentSeverity::parse("Moderado").unwrap(),
        LocationInput::place("Sendero Los Cóndores"),
    )
}

fn finding_draft() -> CaseDraft<FindingCase> {
    CaseDraft::new(
        "Cerco caído",
        "Tramo de cerco perimetral en el suelo",
        FindingKind::Infrastructure,
        FindingSeverity::High,
        LocationInput::point(-22.91, -68.2),
    )
}

#[test]
fn incident_walkthrough_from_report_to_resolution() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let actor_a = ranger();

    let inc = svc.create(&tourist_incident(), &actor_a).expect("create");
    assert_eq!(inc.kind, IncidentKind::Visitor);
    assert_eq!(inc.severity, IncidentSeverity::Moderate);
    assert_eq!(inc.status, IncidentStatus::Reported);
    assert_eq!(inc.audit_trail.len(), 1);
    assert_eq!(inc.audit_trail.first().action, INITIAL_REPORT);
    assert_eq!(inc.audit_trail.first().actor, "ranger-a");
    assert_eq!(inc.audit_trail.first().timestamp, inc.reported_at);

    clock.advance(Duration::minutes(5));
    let inc = svc
        .change_status(inc.id, IncidentStatus::InAttention, &actor_a, Some("begin review"))
        .expect("to in attention")
        .applied()
        .expect("applied");
    assert_eq!(inc.status, IncidentStatus::InAttention);
    assert_eq!(inc.audit_trail.len(), 2);
    assert_eq!(inc.audit_trail.last().action, "Status change to in_attention");
    assert_eq!(inc.audit_trail.last().notes.as_deref(), Some("begin review"));
    assert_eq!(inc.resolved_at, None);

    clock.advance(Duration::minutes(5));
    let err = svc
        .change_status(inc.id, IncidentStatus::Reported, &actor_a, None)
        .unwrap_err();
    assert_eq!(err.code, INVALID_TRANSITION);
    let stored: Incident = svc.get(inc.id).expect("get");
    assert_eq!(stored, inc);

    let resolved_at = clock.now();
    let inc = svc
        .change_status(inc.id, IncidentStatus::Resolved, &actor_a, None)
        .expect("resolve")
        .applied()
        .expect("applied");
    assert_eq!(inc.status, IncidentStatus::Resolved);
    assert_eq!(inc.resolved_at, Some(resolved_at));
    assert_eq!(inc.audit_trail.len(), 3);
    assert_eq!(
        inc.audit_trail.last().notes.as_deref(),
        Some("in_attention → resolved")
    );

    let err = svc
        .append_follow_up::<Incident>(inc.id, "Llamada de seguimiento", None, &actor_a)
        .unwrap_err();
    assert_eq!(err.code, TERMINAL);
    let stored: Incident = svc.get(inc.id).expect("get");
    assert_eq!(stored.audit_trail.len(), 3);
}

#[test]
fn invalid_draft_lists_every_problem_and_stores_nothing() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);

    let draft = CaseDraft::<IncidentCase> {
        title: "   ".into(),
        location: LocationInput {
            place: None,
            latitude: Some(95.0),
            longitude: Some(10.0),
        },
        ..CaseDraft::default()
    };
    let err = svc.create(&draft, &ranger()).unwrap_err();
    assert_eq!(err.code, VALIDATION_FAILED);
    let fields: Vec<_> = err.field_errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(
        fields,
        vec!["title", "description", "kind", "severity", "location.latitude"]
    );
    assert!(svc.store().load_all::<Incident>().unwrap().is_empty());
}

#[test]
fn audit_trail_grows_by_one_per_status_change_or_follow_up() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();

    let inc = svc.create(&tourist_incident(), &sup).unwrap();
    let mut expected = 1;

    let steps: &[IncidentStatus] = &[
        IncidentStatus::Escalated,
        IncidentStatus::InAttention,
        IncidentStatus::Escalated,
    ];
    for status in steps {
        clock.advance(Duration::minutes(1));
        svc.change_status(inc.id, *status, &sup, None).unwrap();
        expected += 1;
        let stored: Incident = svc.get(inc.id).unwrap();
        assert_eq!(stored.audit_trail.len(), expected);

        clock.advance(Duration::minutes(1));
        svc.append_follow_up::<Incident>(inc.id, "Contacto con carabineros", Some("sin novedad"), &sup)
            .unwrap();
        expected += 1;
        let stored: Incident = svc.get(inc.id).unwrap();
        assert_eq!(stored.audit_trail.len(), expected);
        assert_eq!(stored.status, *status);
    }

    let stored: Incident = svc.get(inc.id).unwrap();
    let stamps: Vec<_> = stored.audit_trail.iter().map(|e| e.timestamp).collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
}

#[test]
fn requesting_the_current_status_is_no_change_and_leaves_no_trace() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();

    let inc = svc.create(&tourist_incident(), &sup).unwrap();
    let outcome = svc
        .change_status(inc.id, IncidentStatus::Reported, &sup, Some("again"))
        .unwrap();
    assert!(matches!(outcome, Outcome::NoChange));
    let stored: Incident = svc.get(inc.id).unwrap();
    assert_eq!(stored.audit_trail.len(), 1);
}

#[test]
fn findings_move_strictly_forward_one_step_at_a_time() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();
    let f = svc.create(&finding_draft(), &sup).unwrap();

    let order = FindingStatus::ALL;
    for (i, next) in order.iter().enumerate().skip(1) {
        let current: Finding = svc.get(f.id).unwrap();
        assert_eq!(current.status, order[i - 1]);

        for target in order {
            if *target == *next || *target == current.status {
                continue;
            }
            let err = svc.change_status(f.id, *target, &sup, None).unwrap_err();
            assert_eq!(err.code, INVALID_TRANSITION, "{} -> {}", current.status, target);
        }

        svc.change_status(f.id, *next, &sup, None).unwrap();
    }

    let done: Finding = svc.get(f.id).unwrap();
    assert_eq!(done.status, FindingStatus::Resolved);
    assert!(done.resolved_at.is_some());
    for target in FindingStatus::ALL {
        if *target == FindingStatus::Resolved {
            continue;
        }
        let err = svc.change_status(f.id, *target, &sup, None).unwrap_err();
        assert_eq!(err.code, TERMINAL);
    }
    let after: Finding = svc.get(f.id).unwrap();
    assert_eq!(after, done);
}

#[test]
fn resolved_at_is_set_exactly_when_status_is_terminal() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();
    let inc = svc.create(&tourist_incident(), &sup).unwrap();

    for status in [
        IncidentStatus::InAttention,
        IncidentStatus::Escalated,
        IncidentStatus::Resolved,
    ] {
        clock.advance(Duration::hours(1));
        svc.change_status(inc.id, status, &sup, None).unwrap();
        let stored: Incident = svc.get(inc.id).unwrap();
        assert_eq!(stored.resolved_at.is_some(), stored.is_terminal());
    }
}

#[test]
fn field_officer_cannot_change_a_case_they_did_not_report() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let inc = svc.create(&tourist_incident(), &supervisor()).unwrap();

    let err = svc
        .append_follow_up::<Incident>(inc.id, "Revisión", None, &ranger())
        .unwrap_err();
    assert_eq!(err.code, ACCESS_DENIED);
}

#[test]
fn unknown_id_is_not_found() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let err = svc
        .change_status(42, IncidentStatus::InAttention, &supervisor(), None)
        .unwrap_err();
    assert_eq!(err.code, NOT_FOUND);
}

#[test]
fn failed_write_is_a_remote_failure_and_store_keeps_the_old_copy() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();
    let inc = svc.create(&tourist_incident(), &sup).unwrap();

    svc.store_mut().fail_next_writes(1);
    let err = svc
        .change_status(inc.id, IncidentStatus::InAttention, &sup, None)
        .unwrap_err();
    assert_eq!(err.code, REMOTE_FAILURE);
    assert!(err.retryable);

    let stored: Incident = svc.get(inc.id).unwrap();
    assert_eq!(stored, inc);

    // Retry goes through once the backend is back.
    let applied = svc
        .change_status(inc.id, IncidentStatus::InAttention, &sup, None)
        .unwrap();
    assert!(!applied.is_no_change());
}

#[test]
fn failed_create_leaves_nothing_behind() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    svc.store_mut().fail_next_writes(1);
    let err = svc.create(&tourist_incident(), &ranger()).unwrap_err();
    assert_eq!(err.code, REMOTE_FAILURE);
    assert!(svc.reload().unwrap().incidents.is_empty());
}

fn activity_draft(kind: ActivityKind) -> ActivityDraft {
    ActivityDraft {
        title: "Recorrido sector norte".into(),
        kind: Some(kind),
        area: Some("Sector norte".into()),
        assigned_to: "ranger-a".into(),
        scheduled_for: Some(start() + Duration::days(1)),
    }
}

#[test]
fn only_supervisors_schedule_activities_and_assignees_must_be_rangers() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);

    let err = svc
        .create_activity(&activity_draft(ActivityKind::Patrol), &ranger())
        .unwrap_err();
    assert_eq!(err.code, ACCESS_DENIED);

    let mut draft = activity_draft(ActivityKind::Patrol);
    draft.assigned_to = "ghost".into();
    let err = svc.create_activity(&draft, &supervisor()).unwrap_err();
    assert_eq!(err.code, VALIDATION_FAILED);
    assert_eq!(err.field_errors[0].field, "assigned_to");

    // Known to the directory, but supervisors are not assignees.
    draft.assigned_to = "sup-1".into();
    let err = svc.create_activity(&draft, &supervisor()).unwrap_err();
    assert_eq!(err.code, VALIDATION_FAILED);
    assert_eq!(err.field_errors[0].field, "assigned_to");

    let activity = svc
        .create_activity(&activity_draft(ActivityKind::Patrol), &supervisor())
        .unwrap();
    assert_eq!(activity.status, ActivityStatus::Scheduled);
    assert_eq!(activity.created_by, "sup-1");
    assert_eq!(activity.audit_trail.len(), 1);
}

#[test]
fn activities_are_editable_only_while_scheduled() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();
    let activity = svc
        .create_activity(&activity_draft(ActivityKind::Maintenance), &sup)
        .unwrap();

    let patch = ActivityPatch {
        area: Some("Sector sur".into()),
        ..ActivityPatch::default()
    };
    let updated = svc
        .update_activity(activity.id, &patch, &sup)
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(updated.area.as_deref(), Some("Sector sur"));
    assert_eq!(updated.audit_trail.len(), 2);

    assert!(svc
        .update_activity(activity.id, &patch, &sup)
        .unwrap()
        .is_no_change());

    let reassign = ActivityPatch {
        assigned_to: Some("sup-1".into()),
        ..ActivityPatch::default()
    };
    let err = svc.update_activity(activity.id, &reassign, &sup).unwrap_err();
    assert_eq!(err.code, VALIDATION_FAILED);
    assert_eq!(err.field_errors[0].field, "assigned_to");
    let stored: Activity = svc.get(activity.id).unwrap();
    assert_eq!(stored.assigned_to, "ranger-a");

    svc.change_status(activity.id, ActivityStatus::InProgress, &sup, None)
        .unwrap();
    let err = svc.update_activity(activity.id, &patch, &sup).unwrap_err();
    assert_eq!(err.code, LOCKED);
}

#[test]
fn cancelling_an_activity_is_a_status_change_and_closes_it() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();
    let activity = svc
        .create_activity(&activity_draft(ActivityKind::Training), &sup)
        .unwrap();

    let cancelled = svc
        .cancel_activity(activity.id, &sup, Some("Lluvia intensa"))
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(cancelled.status, ActivityStatus::Cancelled);
    assert!(cancelled.closed_at.is_some());
    assert_eq!(cancelled.audit_trail.last().notes.as_deref(), Some("Lluvia intensa"));

    assert!(svc.cancel_activity(activity.id, &sup, None).unwrap().is_no_change());
    let err = svc
        .change_status(activity.id, ActivityStatus::InProgress, &sup, None)
        .unwrap_err();
    assert_eq!(err.code, TERMINAL);

    // Still there: cancelling never deletes.
    assert_eq!(svc.store().load_all::<Activity>().unwrap().len(), 1);
}

#[test]
fn completed_activity_cannot_be_cancelled() {
    let clock = ManualClock::new(start());
    let mut svc = service(&clock);
    let sup = supervisor();
    let activity = svc
        .create_activity(&activity_draft(ActivityKind::Monitoring), &sup)
        .unwrap();
    svc.change_status(activity.id, ActivityStatus::InProgress, &sup, None)
        .unwrap();
    svc.change_status(activity.id, ActivityStatus::Completed, &sup, None)
        .unwrap();

    let err = svc.cancel_activity(activity.id, &sup, None).unwrap_err();
    assert_eq!(err.code, TERMINAL);
}
