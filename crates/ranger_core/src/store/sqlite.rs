use rusqlite::{params, Connection, OptionalExtension, Params, Transaction};

use super::{decode, encode, CaseStore};
use crate::domain::vocab::Vocabulary;
use crate::domain::{Activity, Finding, Record};
use crate::error::AppError;

/// Workspace-local SQLite store. One table per record family; the record itself lives in
/// `payload_json`.
pub struct SqliteCaseStore {
    conn: Connection,
}

fn query_failed(what: &str, e: rusqlite::Error) -> AppError {
    AppError::new("DB_QUERY_FAILED", what.to_string()).with_details(e.to_string())
}

fn write_failed(what: &str, e: rusqlite::Error) -> AppError {
    AppError::new("DB_WRITE_FAILED", what.to_string()).with_details(e.to_string())
}

fn insert_in<R: Record>(tx: &Transaction<'_>, mut record: R) -> Result<R, AppError> {
    let sql = format!(
        "INSERT INTO {}(status, owner_id, payload_json, updated_at) \
         VALUES (?1, ?2, '{{}}', strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
        R::TABLE
    );
    tx.execute(&sql, params![record.status().as_str(), record.owner_id()])
        .map_err(|e| write_failed(&format!("Failed to insert {}", R::LABEL), e))?;
    record.set_id(tx.last_insert_rowid());
    update_in(tx, &record)?;
    Ok(record)
}

fn update_in<R: Record>(tx: &Transaction<'_>, record: &R) -> Result<(), AppError> {
    let payload = encode(record)?;
    let sql = format!(
        "UPDATE {} SET status = ?1, owner_id = ?2, payload_json = ?3, \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE id = ?4",
        R::TABLE
    );
    let changed = tx
        .execute(
            &sql,
            params![
                record.status().as_str(),
                record.owner_id(),
                payload,
                record.id()
            ],
        )
        .map_err(|e| write_failed(&format!("Failed to save {}", R::LABEL), e))?;
    if changed == 0 {
        return Err(AppError::not_found(R::LABEL, record.id()));
    }
    Ok(())
}

impl SqliteCaseStore {
    /// Wrap an already-migrated connection (see [`crate::db::migrate`]).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count<R: Record>(&self) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| query_failed(&format!("Failed to count {}", R::TABLE), e))
    }

    fn transaction(&mut self) -> Result<Transaction<'_>, AppError> {
        self.conn.transaction().map_err(|e| {
            AppError::new("DB_TX_FAILED", "Failed to start transaction").with_details(e.to_string())
        })
    }

    fn load_rows<R: Record, P: Params>(&self, sql: &str, params: P) -> Result<Vec<R>, AppError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| query_failed(&format!("Failed to prepare {} query", R::TABLE), e))?;
        let rows = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(|e| query_failed(&format!("Failed to query {}", R::TABLE), e))?;

        let mut out = Vec::new();
        for r in rows {
            let payload =
                r.map_err(|e| query_failed(&format!("Failed to read {} row", R::LABEL), e))?;
            out.push(decode(&payload)?);
        }
        Ok(out)
    }
}

fn commit(tx: Transaction<'_>) -> Result<(), AppError> {
    tx.commit().map_err(|e| {
        AppError::new("DB_TX_FAILED", "Failed to commit transaction").with_details(e.to_string())
    })
}

impl CaseStore for SqliteCaseStore {
    fn load_all<R: Record>(&self) -> Result<Vec<R>, AppError> {
        let sql = format!("SELECT payload_json FROM {} ORDER BY id ASC", R::TABLE);
        self.load_rows(&sql, params![])
    }

    fn load_owned<R: Record>(&self, owner_id: &str) -> Result<Vec<R>, AppError> {
        let sql = format!(
            "SELECT payload_json FROM {} WHERE owner_id = ?1 ORDER BY id ASC",
            R::TABLE
        );
        self.load_rows(&sql, params![owner_id])
    }

    fn get<R: Record>(&self, id: i64) -> Result<R, AppError> {
        let sql = format!("SELECT payload_json FROM {} WHERE id = ?1", R::TABLE);
        let payload: Option<String> = self
            .conn
            .query_row(&sql, [id], |row| row.get(0))
            .optional()
            .map_err(|e| query_failed(&format!("Failed to query {}", R::LABEL), e))?;
        match payload {
            Some(p) => decode(&p),
            None => Err(AppError::not_found(R::LABEL, id)),
        }
    }

    fn insert<R: Record>(&mut self, record: R) -> Result<R, AppError> {
        let tx = self.transaction()?;
        let stored = insert_in(&tx, record)?;
        commit(tx)?;
        Ok(stored)
    }

    fn save<R: Record>(&mut self, record: &R) -> Result<(), AppError> {
        let tx = self.transaction()?;
        update_in(&tx, record)?;
        commit(tx)
    }

    fn commit_patrol(
        &mut self,
        findings: Vec<Finding>,
        activity: &Activity,
    ) -> Result<Vec<Finding>, AppError> {
        // Dropping `tx` on any early return rolls everything back.
        let tx = self.transaction()?;
        let mut stored = Vec::with_capacity(findings.len());
        for f in findings {
            stored.push(insert_in(&tx, f)?);
        }
        update_in(&tx, activity)?;
        commit(tx)?;
        Ok(stored)
    }
}
