use std::collections::HashSet;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::config::LifecycleConfig;
use crate::domain::{
    ActivityDraft, ActivityKind, CaseDraft, CaseType, Evidence, EvidenceDraft, GeoPoint, Location,
    LocationInput,
};
use crate::error::FieldError;

pub(crate) fn fingerprint(reference: &str) -> String {
    hex::encode(Sha256::digest(reference.trim().as_bytes()))
}

/// Required, trimmed, bounded free text. Returns the trimmed value when it is usable.
pub(crate) fn check_text(
    field: &str,
    value: &str,
    max_chars: Option<usize>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, "is required"));
        return None;
    }
    if let Some(max) = max_chars {
        if trimmed.chars().count() > max {
            errors.push(FieldError::new(
                field,
                format!("must be at most {max} characters"),
            ));
            return None;
        }
    }
    Some(trimmed.to_string())
}

pub(crate) fn check_required<V: Copy>(
    field: &str,
    value: Option<V>,
    errors: &mut Vec<FieldError>,
) -> Option<V> {
    if value.is_none() {
        errors.push(FieldError::new(field, "is required"));
    }
    value
}

/// Both-or-neither coordinates, in range, and at least one of place/coordinates.
pub(crate) fn check_location(
    input: &LocationInput,
    errors: &mut Vec<FieldError>,
) -> Option<Location> {
    let before = errors.len();
    let place = input
        .place
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    let coordinates = match (input.latitude, input.longitude) {
        (Some(latitude), Some(longitude)) => {
            if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
                errors.push(FieldError::new(
                    "location.latitude",
                    "must be between -90 and 90",
                ));
            }
            if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
                errors.push(FieldError::new(
                    "location.longitude",
                    "must be between -180 and 180",
                ));
            }
            Some(GeoPoint {
                latitude,
                longitude,
            })
        }
        (Some(_), None) => {
            errors.push(FieldError::new(
                "location.longitude",
                "is required when latitude is given",
            ));
            None
        }
        (None, Some(_)) => {
            errors.push(FieldError::new(
                "location.latitude",
                "is required when longitude is given",
            ));
            None
        }
        (None, None) => None,
    };

    if errors.len() > before {
        return None;
    }
    if place.is_none() && coordinates.is_none() {
        errors.push(FieldError::new(
            "location",
            "a place description or coordinates are required",
        ));
        return None;
    }
    Some(Location { place, coordinates })
}

pub(crate) fn check_parties(
    parties: &[String],
    config: &LifecycleConfig,
    errors: &mut Vec<FieldError>,
) -> Vec<String> {
    if parties.len() > config.max_involved_parties {
        errors.push(FieldError::new(
            "involved_parties",
            format!("at most {} entries", config.max_involved_parties),
        ));
    }
    let mut out = Vec::with_capacity(parties.len());
    for (i, p) in parties.iter().enumerate() {
        let p = p.trim();
        if p.is_empty() {
            errors.push(FieldError::new(
                format!("involved_parties[{i}]"),
                "must not be blank",
            ));
        } else {
            out.push(p.to_string());
        }
    }
    out
}

/// Validate evidence drafts and stamp them. `existing` fingerprints count against duplicates.
pub(crate) fn check_evidence(
    field: &str,
    drafts: &[EvidenceDraft],
    existing: &[Evidence],
    config: &LifecycleConfig,
    now: OffsetDateTime,
    errors: &mut Vec<FieldError>,
) -> Vec<Evidence> {
    if existing.len() + drafts.len() > config.max_evidence_per_case {
        errors.push(FieldError::new(
            field,
            format!("at most {} attachments", config.max_evidence_per_case),
        ));
    }

    let mut seen: HashSet<String> = existing.iter().map(|e| e.fingerprint.clone()).collect();
    let mut out = Vec::with_capacity(drafts.len());
    for (i, d) in drafts.iter().enumerate() {
        let Some(reference) = check_text(&format!("{field}[{i}].reference"), &d.reference, None, errors)
        else {
            continue;
        };
        let Some(category) = check_required(&format!("{field}[{i}].category"), d.category, errors)
        else {
            continue;
        };
        let fp = fingerprint(&reference);
        if !seen.insert(fp.clone()) {
            errors.push(FieldError::new(
                format!("{field}[{i}].reference"),
                "is already attached",
            ));
            continue;
        }
        out.push(Evidence {
            reference,
            fingerprint: fp,
            description: d.description.trim().to_string(),
            category,
            captured_at: d.captured_at.unwrap_or(now),
        });
    }
    out
}

/// Everything a case needs before it can be committed, already trimmed and stamped.
#[derive(Debug, Clone)]
pub(crate) struct ValidCase<T: CaseType> {
    pub title: String,
    pub description: String,
    pub kind: T::Kind,
    pub severity: T::Severity,
    pub location: Location,
    pub involved_parties: Vec<String>,
    pub evidence: Vec<Evidence>,
}

/// Validate a case draft, collecting every problem rather than stopping at the first.
pub(crate) fn validate_case_draft<T: CaseType>(
    draft: &CaseDraft<T>,
    config: &LifecycleConfig,
    now: OffsetDateTime,
) -> Result<ValidCase<T>, Vec<FieldError>> {
    let mut errors = Vec::new();
    let title = check_text("title", &draft.title, Some(config.title_max_chars), &mut errors);
    let description = check_text("description", &draft.description, None, &mut errors);
    let kind = check_required("kind", draft.kind, &mut errors);
    let severity = check_required("severity", draft.severity, &mut errors);
    let location = check_location(&draft.location, &mut errors);
    let involved_parties = check_parties(&draft.involved_parties, config, &mut errors);
    let evidence = check_evidence("evidence", &draft.evidence, &[], config, now, &mut errors);

    match (title, description, kind, severity, location) {
        (Some(title), Some(description), Some(kind), Some(severity), Some(location))
            if errors.is_empty() =>
        {
            Ok(ValidCase {
                title,
                description,
                kind,
                severity,
                location,
                involved_parties,
                evidence,
            })
        }
        _ => Err(errors),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ValidActivity {
    pub title: String,
    pub kind: ActivityKind,
    pub area: Option<String>,
    pub assigned_to: String,
    pub scheduled_for: OffsetDateTime,
}

pub(crate) fn validate_activity_draft(
    draft: &ActivityDraft,
    config: &LifecycleConfig,
    is_assignable: impl Fn(&str) -> bool,
) -> Result<ValidActivity, Vec<FieldError>> {
    let mut errors = Vec::new();
    let title = check_text("title", &draft.title, Some(config.title_max_chars), &mut errors);
    let kind = check_required("kind", draft.kind, &mut errors);
    let scheduled_for = check_required("scheduled_for", draft.scheduled_for, &mut errors);
    let assigned_to = check_text("assigned_to", &draft.assigned_to, None, &mut errors);
    if let Some(id) = assigned_to.as_deref() {
        if !is_assignable(id) {
            errors.push(FieldError::new("assigned_to", "is not an assignable ranger"));
        }
    }
    let area = draft
        .area
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    match (title, kind, scheduled_for, assigned_to) {
        (Some(title), Some(kind), Some(scheduled_for), Some(assigned_to)) if errors.is_empty() => {
            Ok(ValidActivity {
                title,
                kind,
                area,
                assigned_to,
                scheduled_for,
            })
        }
        _ => Err(errors),
    }
}
