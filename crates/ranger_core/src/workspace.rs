use std::path::Path;

use crate::domain::{Activity, Finding, Incident};
use crate::error::AppError;
use crate::store::SqliteCaseStore;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct WorkspaceMetadata {
    pub db_path: String,
    pub is_empty: bool,
}

fn validate_db_path(path: &Path) -> Result<(), AppError> {
    if path.as_os_str().is_empty() {
        return Err(AppError::new(
            "WORKSPACE_INVALID_PATH",
            "Workspace DB path is empty",
        ));
    }
    if path.exists() && path.is_dir() {
        return Err(AppError::new(
            "WORKSPACE_INVALID_PATH",
            "Workspace DB path must be a file (not a directory)",
        )
        .with_details(path.display().to_string()));
    }
    Ok(())
}

fn is_empty_store(store: &SqliteCaseStore) -> Result<bool, AppError> {
    Ok(store.count::<Incident>()? == 0
        && store.count::<Finding>()? == 0
        && store.count::<Activity>()? == 0)
}

/// Open an existing workspace database, applying any pending migrations.
pub fn open_workspace_store(db_path: &Path) -> Result<SqliteCaseStore, AppError> {
    validate_db_path(db_path)?;

    if !db_path.is_file() {
        return Err(AppError::new(
            "WORKSPACE_DB_NOT_FOUND",
            "Workspace database file not found",
        )
        .with_details(db_path.display().to_string()));
    }

    let mut conn = crate::db::open(db_path).map_err(|e| {
        let details = e.details.clone().unwrap_or_else(|| e.to_string());
        AppError::new("WORKSPACE_OPEN_FAILED", "Failed to open workspace database")
            .with_details(details)
    })?;

    crate::db::migrate(&mut conn).map_err(|e| {
        let details = e.details.clone().unwrap_or_else(|| e.to_string());
        AppError::new(
            "WORKSPACE_MIGRATION_FAILED",
            "Failed to migrate workspace database",
        )
        .with_details(details)
    })?;

    Ok(SqliteCaseStore::new(conn))
}

/// Create a fresh workspace database. Refuses to touch an existing file.
pub fn create_workspace_store(db_path: &Path) -> Result<SqliteCaseStore, AppError> {
    validate_db_path(db_path)?;

    if db_path.exists() {
        return Err(AppError::new(
            "WORKSPACE_CREATE_FAILED",
            "Workspace DB file already exists",
        )
        .with_details(db_path.display().to_string()));
    }

    let parent = db_path.parent().ok_or_else(|| {
        AppError::new(
            "WORKSPACE_INVALID_PATH",
            "Workspace DB path must have a parent directory",
        )
        .with_details(db_path.display().to_string())
    })?;
    std::fs::create_dir_all(parent).map_err(|e| {
        AppError::new(
            "WORKSPACE_CREATE_FAILED",
            "Failed to create workspace directory",
        )
        .with_details(format!("path={}; err={}", parent.display(), e))
    })?;

    let mut conn = crate::db::open(db_path).map_err(|e| {
        let details = e.details.clone().unwrap_or_else(|| e.to_string());
        AppError::new("WORKSPACE_CREATE_FAILED", "Failed to create workspace database")
            .with_details(details)
    })?;

    crate::db::migrate(&mut conn).map_err(|e| {
        let details = e.details.clone().unwrap_or_else(|| e.to_string());
        AppError::new(
            "WORKSPACE_MIGRATION_FAILED",
            "Failed to migrate newly created workspace database",
        )
        .with_details(details)
    })?;

    tracing::info!(path = %db_path.display(), "created workspace");
    Ok(SqliteCaseStore::new(conn))
}

pub fn open_workspace(db_path: &Path) -> Result<WorkspaceMetadata, AppError> {
    let store = open_workspace_store(db_path)?;
    Ok(WorkspaceMetadata {
        db_path: db_path.to_string_lossy().to_string(),
        is_empty: is_empty_store(&store)?,
    })
}

pub fn create_workspace(db_path: &Path) -> Result<WorkspaceMetadata, AppError> {
    let store = create_workspace_store(db_path)?;
    Ok(WorkspaceMetadata {
        db_path: db_path.to_string_lossy().to_string(),
        is_empty: is_empty_store(&store)?,
    })
}

pub fn db_is_empty(db_path: &Path) -> Result<bool, AppError> {
    let store = open_workspace_store(db_path)?;
    is_empty_store(&store)
}
