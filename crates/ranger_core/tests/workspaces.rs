use tempfile::tempdir;
use time::OffsetDateTime;

use ranger_core::clock::ManualClock;
use ranger_core::collection::ConsoleFilters;
use ranger_core::config::LifecycleConfig;
use ranger_core::demo::{demo_catalog, seed_demo_dataset};
use ranger_core::domain::{
    Activity, ActivityDraft, ActivityKind, ActivityStatus, Actor, CaseDraft, Finding,
    FindingKind, FindingSeverity, Incident, IncidentCase, IncidentKind, IncidentSeverity,
    IncidentStatus, LocationInput, Role,
};
use ranger_core::lifecycle::CaseLifecycleService;
use ranger_core::patrol::PatrolSession;
use ranger_core::store::{CaseStore, SqliteCaseStore};
use ranger_core::workspace::{
    create_workspace, create_workspace_store, db_is_empty, open_workspace, open_workspace_store,
};

fn base() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap()
}

fn count(store: &SqliteCaseStore, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn workspace_isolation_create_open_switch() {
    let tmp = tempdir().unwrap();
    let w1 = tmp.path().join("w1.sqlite");
    let w2 = tmp.path().join("w2.sqlite");

    let clock = ManualClock::new(base());
    let store = create_workspace_store(&w1).expect("create w1");
    let mut svc =
        CaseLifecycleService::with_clock(store, &clock, demo_catalog(), LifecycleConfig::default());
    seed_demo_dataset(&mut svc, base()).expect("seed w1");
    assert!(count(svc.store(), "incidents") > 0);
    drop(svc);

    let store2 = create_workspace_store(&w2).expect("create w2");
    assert_eq!(count(&store2, "incidents"), 0);
    assert!(db_is_empty(&w2).expect("is_empty"));

    let reopened = open_workspace_store(&w1).expect("open w1");
    assert!(count(&reopened, "incidents") > 0);
    assert!(!db_is_empty(&w1).unwrap());
}

#[test]
fn create_refuses_existing_file_and_open_requires_one() {
    let tmp = tempdir().unwrap();
    let w = tmp.path().join("nested").join("w.sqlite");

    let meta = create_workspace(&w).expect("create");
    assert!(meta.is_empty);
    let err = create_workspace(&w).unwrap_err();
    assert_eq!(err.code, "WORKSPACE_CREATE_FAILED");

    let meta = open_workspace(&w).expect("reopen");
    assert!(meta.is_empty);

    let err = open_workspace(&tmp.path().join("missing.sqlite")).unwrap_err();
    assert_eq!(err.code, "WORKSPACE_DB_NOT_FOUND");
    let err = open_workspace(tmp.path()).unwrap_err();
    assert_eq!(err.code, "WORKSPACE_INVALID_PATH");
}

#[test]
fn sqlite_store_round_trips_records_and_status_columns() {
    let tmp = tempdir().unwrap();
    let w = tmp.path().join("roundtrip.sqlite");
    let clock = ManualClock::new(base());
    let sup = Actor::new("sup-01", "Carlos Rojas", Role::Supervisor);

    let store = create_workspace_store(&w).unwrap();
    let mut svc =
        CaseLifecycleService::with_clock(store, &clock, demo_catalog(), LifecycleConfig::default());
    let inc = svc
        .create(
            &CaseDraft::<IncidentCase>::new(
                "Derrumbe en ruta",
                "Rocas sobre el camino de acceso",
                IncidentKind::Emergency,
                IncidentSeverity::Serious,
                LocationInput::place("Acceso norte"),
            ),
            &sup,
        )
        .unwrap();
    let inc = svc
        .change_status(inc.id, IncidentStatus::Escalated, &sup, Some("Vialidad avisada"))
        .unwrap()
        .applied()
        .unwrap();
    drop(svc);

    let store = open_workspace_store(&w).unwrap();
    let loaded: Incident = store.get(inc.id).unwrap();
    assert_eq!(loaded, inc);
    let status: String = store
        .connection()
        .query_row("SELECT status FROM incidents WHERE id = ?1", [inc.id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(status, "escalated");
    assert_eq!(store.load_all::<Incident>().unwrap().len(), 1);
}

#[test]
fn sqlite_patrol_commit_is_one_transaction() {
    let tmp = tempdir().unwrap();
    let w = tmp.path().join("patrol.sqlite");
    let clock = ManualClock::new(base());
    let sup = Actor::new("sup-01", "Carlos Rojas", Role::Supervisor);
    let ranger = Actor::new("ranger-01", "Ana Quispe", Role::FieldOfficer);

    let store = create_workspace_store(&w).unwrap();
    let mut svc =
        CaseLifecycleService::with_clock(store, &clock, demo_catalog(), LifecycleConfig::default());
    let activity = svc
        .create_activity(
            &ActivityDraft {
                title: "Patrullaje nocturno".into(),
                kind: Some(ActivityKind::Patrol),
                area: Some("Refugio Alto".into()),
                assigned_to: ranger.id.clone(),
                scheduled_for: Some(base()),
            },
            &sup,
        )
        .unwrap();

    let mut session = PatrolSession::new(activity.id);
    session.start(&mut svc, &ranger).unwrap();
    session
        .draft_finding(
            &svc,
            CaseDraft::new(
                "Letrero dañado",
                "Letrero de sendero quebrado",
                FindingKind::Infrastructure,
                FindingSeverity::Low,
                LocationInput::place("Refugio Alto"),
            ),
        )
        .unwrap();
    session
        .draft_finding(
            &svc,
            CaseDraft::new(
                "Cóndor herido",
                "Ave con ala lesionada",
                FindingKind::Fauna,
                FindingSeverity::Critical,
                LocationInput::point(-23.01, -67.8),
            ),
        )
        .unwrap();

    // Make the finding insert fail inside the transaction: the activity update must roll back too.
    svc.store()
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_condor BEFORE UPDATE ON findings \
             WHEN NEW.payload_json LIKE '%Cóndor%' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
    let err = session.finish(&mut svc, None).unwrap_err();
    assert_eq!(err.code, "REMOTE_FAILURE");
    assert_eq!(count(svc.store(), "findings"), 0);
    let stored: Activity = svc.get(activity.id).unwrap();
    assert_eq!(stored.status, ActivityStatus::InProgress);

    svc.store()
        .connection()
        .execute_batch("DROP TRIGGER reject_condor;")
        .unwrap();
    let report = session.finish(&mut svc, Some("Sin incidentes")).unwrap();
    assert_eq!(report.findings.len(), 2);
    assert_eq!(count(svc.store(), "findings"), 2);
    let stored: Activity = svc.get(activity.id).unwrap();
    assert_eq!(stored.status, ActivityStatus::Completed);
    let findings: Vec<Finding> = svc.store().load_all().unwrap();
    assert_eq!(findings, report.findings);
}

#[test]
fn field_officer_reload_reads_only_owned_rows() {
    let tmp = tempdir().unwrap();
    let w = tmp.path().join("scoped.sqlite");
    let clock = ManualClock::new(base());
    let ranger = Actor::new("ranger-02", "Mateo Huanca", Role::FieldOfficer);
    let sup = Actor::new("sup-01", "Carlos Rojas", Role::Supervisor);

    let store = create_workspace_store(&w).unwrap();
    let mut svc =
        CaseLifecycleService::with_clock(store, &clock, demo_catalog(), LifecycleConfig::default());
    seed_demo_dataset(&mut svc, base()).unwrap();

    let owned: Vec<Incident> = svc.store().load_owned("ranger-02").unwrap();
    assert!(!owned.is_empty());
    assert!(owned.iter().all(|i| i.reported_by == "ranger-02"));
    assert!(owned.windows(2).all(|pair| pair[0].id < pair[1].id));
    assert!(svc.store().load_owned::<Incident>("nobody").unwrap().is_empty());

    let full = svc.reload().unwrap();
    let scoped = svc.reload_for(&ranger).unwrap();
    assert!(scoped.incidents.len() < full.incidents.len());
    assert!(scoped.activities.iter().all(|a| a.assigned_to == "ranger-02"));
    assert_eq!(
        scoped.dashboard(&ranger, &ConsoleFilters::default()),
        full.dashboard(&ranger, &ConsoleFilters::default())
    );
    assert_eq!(svc.reload_for(&sup).unwrap(), full);
}
