use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::domain::{
    ActivityDraft, ActivityKind, Actor, CaseDraft, EvidenceCategory, EvidenceDraft, FindingCase,
    FindingKind, FindingSeverity, FindingStatus, IncidentCase, IncidentKind, IncidentSeverity,
    IncidentStatus, LocationInput, Role, Vocabulary,
};
use crate::error::AppError;
use crate::lifecycle::CaseLifecycleService;
use crate::patrol::PatrolSession;
use crate::store::CaseStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DemoSeedSummary {
    pub incidents: i64,
    pub findings: i64,
    pub activities: i64,
}

/// Directory used by the demo dataset.
pub fn demo_catalog() -> Catalog {
    Catalog::new([
        Actor::new("ranger-01", "Ana Quispe", Role::FieldOfficer),
        Actor::new("ranger-02", "Mateo Huanca", Role::FieldOfficer),
        Actor::new("ranger-03", "Lucía Mamani", Role::FieldOfficer),
        Actor::new("sup-01", "Carlos Rojas", Role::Supervisor),
        Actor::new("admin-01", "Elena Torres", Role::Administrator),
    ])
}

/// Seed a deterministic dataset large enough to make the dashboards meaningful.
///
/// Everything goes through the lifecycle service so every record carries a real trail.
pub fn seed_demo_dataset<S: CaseStore, C: Clock>(
    service: &mut CaseLifecycleService<S, C>,
    base: OffsetDateTime,
) -> Result<DemoSeedSummary, AppError> {
    let supervisor = Actor::new("sup-01", "Carlos Rojas", Role::Supervisor);
    let rangers = [
        Actor::new("ranger-01", "Ana Quispe", Role::FieldOfficer),
        Actor::new("ranger-02", "Mateo Huanca", Role::FieldOfficer),
        Actor::new("ranger-03", "Lucía Mamani", Role::FieldOfficer),
    ];
    let places = [
        "Sendero Los Cóndores",
        "Laguna Verde",
        "Mirador del Valle",
        "Refugio Alto",
        "Quebrada Honda",
    ];

    let mut summary = DemoSeedSummary {
        incidents: 0,
        findings: 0,
        activities: 0,
    };

    // Incidents walk through every workflow position in turn.
    for i in 0..24usize {
        let ranger = &rangers[i % rangers.len()];
        let kind = IncidentKind::ALL[i % IncidentKind::ALL.len()];
        let severity = IncidentSeverity::ALL[(i / 2) % IncidentSeverity::ALL.len()];
        let draft = CaseDraft::<IncidentCase>::new(
            format!("Incidente demo {}", i + 1),
            format!("Situación con {kind} registrada en terreno"),
            kind,
            severity,
            LocationInput::place(places[i % places.len()]),
        )
        .with_party(format!("Visitante {}", i + 1));
        let incident = service.create(&draft, ranger)?;
        summary.incidents += 1;

        let path: &[IncidentStatus] = match i % 4 {
            0 => &[],
            1 => &[IncidentStatus::InAttention],
            2 => &[IncidentStatus::Escalated],
            _ => &[IncidentStatus::InAttention, IncidentStatus::Resolved],
        };
        for status in path {
            service.change_status(incident.id, *status, &supervisor, None)?;
        }
    }

    // Patrols: half finished with findings, the rest left scheduled.
    for i in 0..10usize {
        let ranger = &rangers[i % rangers.len()];
        let activity = service.create_activity(
            &ActivityDraft {
                title: format!("Patrullaje demo {}", i + 1),
                kind: Some(ActivityKind::Patrol),
                area: Some(places[i % places.len()].to_string()),
                assigned_to: ranger.id.clone(),
                scheduled_for: Some(base + Duration::days(i as i64)),
            },
            &supervisor,
        )?;
        summary.activities += 1;

        if i % 2 == 1 {
            continue;
        }

        let mut session = PatrolSession::new(activity.id);
        session.start(service, ranger)?;
        for j in 0..2usize {
            let n = i * 2 + j;
            let kind = FindingKind::ALL[n % FindingKind::ALL.len()];
            let draft = CaseDraft::<FindingCase>::new(
                format!("Hallazgo demo {}", n + 1),
                format!("Observación de tipo {kind}"),
                kind,
                FindingSeverity::ALL[n % FindingSeverity::ALL.len()],
                LocationInput::point(-22.9 - n as f64 * 0.01, -68.2 + n as f64 * 0.01),
            )
            .with_evidence(EvidenceDraft::new(
                format!("demo://patrol-{}/finding-{}.jpg", activity.id, j),
                "Registro fotográfico",
                EvidenceCategory::Photo,
            ));
            session.draft_finding(service, draft)?;
        }
        let report = session.finish(service, Some("Sin novedades adicionales"))?;
        summary.findings += report.findings.len() as i64;

        if let Some(first) = report.findings.first() {
            service.change_status(first.id, FindingStatus::InInvestigation, &supervisor, None)?;
        }
    }

    // One plain monitoring activity that was called off.
    let cancelled = service.create_activity(
        &ActivityDraft {
            title: "Monitoreo de caudal".to_string(),
            kind: Some(ActivityKind::Monitoring),
            area: Some("Quebrada Honda".to_string()),
            assigned_to: rangers[0].id.clone(),
            scheduled_for: Some(base),
        },
        &supervisor,
    )?;
    service.cancel_activity(cancelled.id, &supervisor, Some("Crecida del río"))?;
    summary.activities += 1;

    Ok(summary)
}
