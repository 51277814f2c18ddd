//! Validation run configuration

use serde::{Deserialize, Serialize};

/// Which parts of a store a run visits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Databases never visited
    pub skip_databases: Vec<String>,
    /// Collections whose name starts with this prefix are never visited
    pub skip_collection_prefix: String,
    /// Restrict the run to one database
    pub database: Option<String>,
    /// Restrict the run to one collection name (in every visited database)
    pub collection: Option<String>,
    /// End the run at the first index that fails instead of recording it
    pub fail_fast: bool,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            skip_databases: vec!["admin".to_string(), "local".to_string()],
            skip_collection_prefix: "system.".to_string(),
            database: None,
            collection: None,
            fail_fast: false,
        }
    }
}

impl ValidateConfig {
    pub fn visits_database(&self, name: &str) -> bool {
        if self.skip_databases.iter().any(|skip| skip == name) {
            return false;
        }
        self.database.as_deref().map_or(true, |only| only == name)
    }

    pub fn visits_collection(&self, name: &str) -> bool {
        if !self.skip_collection_prefix.is_empty() && name.starts_with(&self.skip_collection_prefix)
        {
            return false;
        }
        self.collection.as_deref().map_or(true, |only| only == name)
    }
}
