//! Inbound shapes submitted by the console forms. Nothing here is trusted until it has been
//! through [`crate::validate`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::case::CaseType;
use super::{ActivityKind, EvidenceCategory};

/// Raw location input. Latitude and longitude arrive as separate form fields and must be
/// supplied together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl LocationInput {
    pub fn place(place: impl Into<String>) -> Self {
        Self {
            place: Some(place.into()),
            ..Self::default()
        }
    }

    pub fn point(latitude: f64, longitude: f64) -> Self {
        Self {
            place: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDraft {
    pub reference: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<EvidenceCategory>,
    /// Defaults to the commit time when the form does not carry one.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub captured_at: Option<OffsetDateTime>,
}

impl EvidenceDraft {
    pub fn new(
        reference: impl Into<String>,
        description: impl Into<String>,
        category: EvidenceCategory,
    ) -> Self {
        Self {
            reference: reference.into(),
            description: description.into(),
            category: Some(category),
            captured_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CaseDraft<T: CaseType> {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: Option<T::Kind>,
    #[serde(default)]
    pub severity: Option<T::Severity>,
    #[serde(default)]
    pub location: LocationInput,
    #[serde(default)]
    pub involved_parties: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<EvidenceDraft>,
}

impl<T: CaseType> Default for CaseDraft<T> {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            kind: None,
            severity: None,
            location: LocationInput::default(),
            involved_parties: Vec::new(),
            evidence: Vec::new(),
        }
    }
}

impl<T: CaseType> CaseDraft<T> {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        kind: T::Kind,
        severity: T::Severity,
        location: LocationInput,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: Some(kind),
            severity: Some(severity),
            location,
            involved_parties: Vec::new(),
            evidence: Vec::new(),
        }
    }

    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.involved_parties.push(party.into());
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceDraft) -> Self {
        self.evidence.push(evidence);
        self
    }
}

/// Partial edit of a case. `None` leaves a field as it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CasePatch<T: CaseType> {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: Option<T::Kind>,
    #[serde(default)]
    pub severity: Option<T::Severity>,
    #[serde(default)]
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub involved_parties: Option<Vec<String>>,
}

impl<T: CaseType> Default for CasePatch<T> {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            kind: None,
            severity: None,
            location: None,
            involved_parties: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: Option<ActivityKind>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_for: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub kind: Option<ActivityKind>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_for: Option<OffsetDateTime>,
}
