use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{Actor, Role};
use crate::error::AppError;

/// Read-only reference data loaded from outside the core. The actor directory is what activity
/// assignment is checked against.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    actors: BTreeMap<String, Actor>,
}

#[derive(Deserialize)]
struct CatalogFile {
    actors: Vec<Actor>,
}

impl Catalog {
    pub fn new(actors: impl IntoIterator<Item = Actor>) -> Self {
        Self {
            actors: actors.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    /// Parse the directory export: `{"actors": [{"id", "name", "role"}, ...]}`.
    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let file: CatalogFile = serde_json::from_str(text).map_err(|e| {
            AppError::new("CATALOG_PARSE_FAILED", "Failed to parse actor directory")
                .with_details(e.to_string())
        })?;
        Ok(Self::new(file.actors))
    }

    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actors.contains_key(id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Only field officers carry out activities.
    pub fn is_assignable(&self, id: &str) -> bool {
        self.actor(id)
            .is_some_and(|a| a.role == Role::FieldOfficer)
    }

    /// Rangers an activity can be assigned to.
    pub fn assignable(&self) -> impl Iterator<Item = &Actor> {
        self.actors
            .values()
            .filter(|a| self.is_assignable(&a.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_parses_and_lists_assignable_rangers() {
        let catalog = Catalog::from_json_str(
            r#"{"actors":[
              {"id":"r-1","name":"Ana","role":"field_officer"},
              {"id":"s-1","name":"Luis","role":"Supervisor"}
            ]}"#,
        )
        .unwrap();
        assert!(catalog.contains("s-1"));
        let ids: Vec<_> = catalog.assignable().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["r-1"]);
        assert!(catalog.is_assignable("r-1"));
        assert!(!catalog.is_assignable("s-1"));
        assert!(!catalog.is_assignable("ghost"));
    }

    #[test]
    fn malformed_directory_is_reported() {
        let err = Catalog::from_json_str("{").unwrap_err();
        assert_eq!(err.code, "CATALOG_PARSE_FAILED");
    }
}
