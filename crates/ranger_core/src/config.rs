use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tunables for validation and patrol drafting. Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
    pub title_max_chars: usize,
    pub max_involved_parties: usize,
    pub max_evidence_per_case: usize,
    pub max_draft_findings: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            title_max_chars: 200,
            max_involved_parties: 50,
            max_evidence_per_case: 20,
            max_draft_findings: 25,
        }
    }
}

impl LifecycleConfig {
    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let cfg: Self = serde_json::from_str(text).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Failed to parse lifecycle config")
                .with_details(e.to_string())
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read lifecycle config")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), AppError> {
        for (key, value) in [
            ("title_max_chars", self.title_max_chars),
            ("max_involved_parties", self.max_involved_parties),
            ("max_evidence_per_case", self.max_evidence_per_case),
            ("max_draft_findings", self.max_draft_findings),
        ] {
            if value == 0 {
                return Err(AppError::new(
                    "CONFIG_INVALID",
                    format!("{key} must be greater than zero"),
                ));
            }
        }
        Ok(())
    }
}
