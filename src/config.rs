//! Analysis Configuration
//!
//! Column names and limits used by an analysis pass. Every field has a
//! default matching the conventional order dataset layout, so a config file
//! only needs to list what differs.

use crate::error::{EdaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const ENV_DATE_COLUMN: &str = "ORDERLENS_DATE_COLUMN";
pub const ENV_MEASURE_COLUMN: &str = "ORDERLENS_MEASURE_COLUMN";
pub const ENV_TOP_CATEGORIES: &str = "ORDERLENS_TOP_CATEGORIES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Key columns excluded from numeric analysis even when numeric-typed
    pub id_columns: Vec<String>,

    pub date_column: String,
    pub quantity_column: String,
    pub price_column: String,
    pub discount_column: String,

    /// Name of the derived revenue column
    pub measure_column: String,

    /// Categorical columns offered for revenue breakdowns, in display order
    pub group_candidates: Vec<String>,

    /// Max entries kept per categorical value count
    pub top_categories: usize,

    /// Rows scanned by the CSV reader to infer column types
    pub infer_schema_length: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            id_columns: vec![
                "order_id".to_string(),
                "customer_id".to_string(),
                "product_id".to_string(),
            ],
            date_column: "order_date".to_string(),
            quantity_column: "quantity".to_string(),
            price_column: "price".to_string(),
            discount_column: "discount".to_string(),
            measure_column: "net_revenue".to_string(),
            group_candidates: vec![
                "category".to_string(),
                "region".to_string(),
                "payment_method".to_string(),
            ],
            top_categories: 20,
            infer_schema_length: 1000,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file; missing fields fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EdaError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| EdaError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        debug!("Loaded analysis config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise, then apply env overrides
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Apply `ORDERLENS_*` environment variables on top of this config
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(date_column) = lookup(ENV_DATE_COLUMN) {
            self.date_column = date_column;
        }
        if let Some(measure) = lookup(ENV_MEASURE_COLUMN) {
            self.measure_column = measure;
        }
        if let Some(top) = lookup(ENV_TOP_CATEGORIES) {
            self.top_categories = top.trim().parse().map_err(|_| {
                EdaError::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_TOP_CATEGORIES, top
                ))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.measure_column.trim().is_empty() {
            return Err(EdaError::Config("measure_column must not be empty".to_string()));
        }
        if self.top_categories == 0 {
            return Err(EdaError::Config("top_categories must be at least 1".to_string()));
        }
        if self.infer_schema_length == 0 {
            return Err(EdaError::Config("infer_schema_length must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn is_id_column(&self, name: &str) -> bool {
        self.id_columns.iter().any(|c| c == name)
    }
}
