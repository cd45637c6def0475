//! Source of truth for cases and activities.
//!
//! The lifecycle service is the only writer. Every write is a single call that either lands
//! whole or not at all; callers refresh their view with a full reload afterwards.

pub mod sqlite;

use std::collections::BTreeMap;

use crate::domain::{Activity, Finding, Record};
use crate::error::AppError;

pub use sqlite::SqliteCaseStore;

pub trait CaseStore {
    /// Every record of one family, ordered by id.
    fn load_all<R: Record>(&self) -> Result<Vec<R>, AppError>;

    /// Records one actor reported or is assigned to, ordered by id.
    fn load_owned<R: Record>(&self, owner_id: &str) -> Result<Vec<R>, AppError>;

    fn get<R: Record>(&self, id: i64) -> Result<R, AppError>;

    /// Persist a new record. The store assigns the id and returns the stored copy.
    fn insert<R: Record>(&mut self, record: R) -> Result<R, AppError>;

    /// Overwrite an existing record.
    fn save<R: Record>(&mut self, record: &R) -> Result<(), AppError>;

    /// Insert every finding and overwrite the parent activity atomically.
    fn commit_patrol(
        &mut self,
        findings: Vec<Finding>,
        activity: &Activity,
    ) -> Result<Vec<Finding>, AppError>;
}

pub(crate) fn encode<R: Record>(record: &R) -> Result<String, AppError> {
    serde_json::to_string(record).map_err(|e| {
        AppError::new("STORE_ENCODE_FAILED", format!("Failed to encode {}", R::LABEL))
            .with_details(e.to_string())
    })
}

pub(crate) fn decode<R: Record>(payload: &str) -> Result<R, AppError> {
    serde_json::from_str(payload).map_err(|e| {
        AppError::new("STORE_DECODE_FAILED", format!("Failed to decode {}", R::LABEL))
            .with_details(e.to_string())
    })
}

/// Process-local store. Payloads are kept serialized so nothing handed out by the store can
/// alias what it holds.
#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    tables: BTreeMap<&'static str, BTreeMap<i64, String>>,
    next_ids: BTreeMap<&'static str, i64>,
    failing_writes: u32,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` write calls fail with `STORE_UNAVAILABLE`, as a dropped connection
    /// to the backend would.
    pub fn fail_next_writes(&mut self, n: u32) {
        self.failing_writes = n;
    }

    fn check_available(&mut self) -> Result<(), AppError> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(AppError::new("STORE_UNAVAILABLE", "Store is unavailable")
                .with_retryable(true));
        }
        Ok(())
    }

    fn allocate_id(&mut self, table: &'static str) -> i64 {
        let next = self.next_ids.entry(table).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }
}

impl CaseStore for InMemoryCaseStore {
    fn load_all<R: Record>(&self) -> Result<Vec<R>, AppError> {
        match self.tables.get(R::TABLE) {
            Some(rows) => rows.values().map(|p| decode(p)).collect(),
            None => Ok(Vec::new()),
        }
    }

    fn load_owned<R: Record>(&self, owner_id: &str) -> Result<Vec<R>, AppError> {
        let mut records: Vec<R> = self.load_all()?;
        records.retain(|r| r.owner_id() == owner_id);
        Ok(records)
    }

    fn get<R: Record>(&self, id: i64) -> Result<R, AppError> {
        let payload = self
            .tables
            .get(R::TABLE)
            .and_then(|rows| rows.get(&id))
            .ok_or_else(|| AppError::not_found(R::LABEL, id))?;
        decode(payload)
    }

    fn insert<R: Record>(&mut self, mut record: R) -> Result<R, AppError> {
        self.check_available()?;
        let id = self.allocate_id(R::TABLE);
        record.set_id(id);
        let payload = encode(&record)?;
        self.tables.entry(R::TABLE).or_default().insert(id, payload);
        Ok(record)
    }

    fn save<R: Record>(&mut self, record: &R) -> Result<(), AppError> {
        self.check_available()?;
        let payload = encode(record)?;
        let slot = self
            .tables
            .get_mut(R::TABLE)
            .and_then(|rows| rows.get_mut(&record.id()))
            .ok_or_else(|| AppError::not_found(R::LABEL, record.id()))?;
        *slot = payload;
        Ok(())
    }

    fn commit_patrol(
        &mut self,
        mut findings: Vec<Finding>,
        activity: &Activity,
    ) -> Result<Vec<Finding>, AppError> {
        self.check_available()?;
        let exists = self
            .tables
            .get(Activity::TABLE)
            .is_some_and(|rows| rows.contains_key(&activity.id));
        if !exists {
            return Err(AppError::not_found(Activity::LABEL, activity.id));
        }

        // Encode everything before touching the tables.
        let activity_payload = encode(activity)?;
        let first_id = self.next_ids.get(Finding::TABLE).copied().unwrap_or(1);
        let mut payloads = Vec::with_capacity(findings.len());
        for (offset, finding) in findings.iter_mut().enumerate() {
            finding.set_id(first_id + offset as i64);
            payloads.push((finding.id, encode(finding)?));
        }

        self.next_ids
            .insert(Finding::TABLE, first_id + findings.len() as i64);
        let rows = self.tables.entry(Finding::TABLE).or_default();
        for (id, payload) in payloads {
            rows.insert(id, payload);
        }
        self.tables
            .entry(Activity::TABLE)
            .or_default()
            .insert(activity.id, activity_payload);
        Ok(findings)
    }
}
