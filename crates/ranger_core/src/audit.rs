use serde::{de, Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// One immutable line of a record's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub action: String,
    pub actor: String,
    pub notes: Option<String>,
}

/// Append-only history embedded in every case and activity.
///
/// Invariants held by construction:
/// - never empty (a trail can only be created through [`AuditTrail::seed`]);
/// - timestamps are non-decreasing;
/// - entries are never edited or removed (only shared references are handed out).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AuditTrail(Vec<AuditEntry>);

impl AuditTrail {
    pub fn seed(
        at: OffsetDateTime,
        action: impl Into<String>,
        actor: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        Self(vec![AuditEntry {
            timestamp: at,
            action: action.into(),
            actor: actor.into(),
            notes,
        }])
    }

    /// Append one entry and return it.
    ///
    /// A clock reading older than the last entry is raised to the last entry's timestamp, so call
    /// order and time order always agree.
    pub fn append(
        &mut self,
        at: OffsetDateTime,
        action: impl Into<String>,
        actor: impl Into<String>,
        notes: Option<String>,
    ) -> &AuditEntry {
        let timestamp = match self.0.last() {
            Some(last) if at < last.timestamp => last.timestamp,
            _ => at,
        };
        self.0.push(AuditEntry {
            timestamp,
            action: action.into(),
            actor: actor.into(),
            notes,
        });
        &self.0[self.0.len() - 1]
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    // Always false for a trail built through `seed`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> &AuditEntry {
        &self.0[0]
    }

    pub fn last(&self) -> &AuditEntry {
        &self.0[self.0.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditEntry> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a AuditTrail {
    type Item = &'a AuditEntry;
    type IntoIter = std::slice::Iter<'a, AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for AuditTrail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<AuditEntry>::deserialize(deserializer)?;
        if entries.is_empty() {
            return Err(de::Error::custom("audit trail must contain at least one entry"));
        }
        if let Some(pos) = entries
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(de::Error::custom(format!(
                "audit trail out of order at entry {}",
                pos + 1
            )));
        }
        Ok(Self(entries))
    }
}
