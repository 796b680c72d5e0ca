//! Engine configuration
//!
//! Loaded from TOML or JSON. Two settings are deliberately *not* validated
//! here: table names and repair names. The isolation and repair guards check
//! those on every call, so a bad value surfaces as `forbidden_operation` or
//! `forbidden_repair` instead of being silently accepted or normalised.

use crate::error::CoreError;
use crate::repair;
use crate::tables::TableMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard ceiling on stored plans per workspace
pub const MAX_HISTORY_DEPTH: usize = 3;

/// Default plan size limit
pub const DEFAULT_MAX_PLAN_MUTATIONS: usize = 500;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stored plans kept per workspace (1..=3)
    pub history_depth: usize,
    /// Physical table names
    pub tables: TableMap,
    /// Repairs to apply, in order
    pub repairs: Vec<String>,
    /// Largest plan accepted
    pub max_plan_mutations: usize,
    /// Source label stamped on telemetry records
    pub telemetry_source: String,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With history depth
    #[inline]
    #[must_use]
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    /// With table mapping
    #[inline]
    #[must_use]
    pub fn with_tables(mut self, tables: TableMap) -> Self {
        self.tables = tables;
        self
    }

    /// With repair list
    #[inline]
    #[must_use]
    pub fn with_repairs<I, S>(mut self, repairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repairs = repairs.into_iter().map(Into::into).collect();
        self
    }

    /// With plan size limit
    #[inline]
    #[must_use]
    pub fn with_max_plan_mutations(mut self, max: usize) -> Self {
        self.max_plan_mutations = max;
        self
    }

    /// Check ranges
    ///
    /// # Errors
    /// `CoreError::Config` describing the first offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=MAX_HISTORY_DEPTH).contains(&self.history_depth) {
            return Err(CoreError::Config(format!(
                "history_depth must be between 1 and {MAX_HISTORY_DEPTH}, got {}",
                self.history_depth
            )));
        }
        if self.max_plan_mutations == 0 {
            return Err(CoreError::Config(
                "max_plan_mutations must be at least 1".to_string(),
            ));
        }
        if self.telemetry_source.trim().is_empty() {
            return Err(CoreError::Config(
                "telemetry_source must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `CoreError::Toml` for malformed input, `CoreError::Config` when a field
    /// is out of range.
    pub fn from_toml_str(input: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON
    ///
    /// # Errors
    /// `CoreError::Json` for malformed input, `CoreError::Config` when a field
    /// is out of range.
    pub fn from_json_str(input: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file
    ///
    /// # Errors
    /// `CoreError::Io` when the file cannot be read,
    /// `CoreError::UnsupportedFormat` for any other extension, otherwise as
    /// for the string parsers.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::io_error(path, e))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&raw),
            Some("json") => Self::from_json_str(&raw),
            _ => Err(CoreError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: MAX_HISTORY_DEPTH,
            tables: TableMap::default(),
            repairs: repair::approved_names(),
            max_plan_mutations: DEFAULT_MAX_PLAN_MUTATIONS,
            telemetry_source: "mindmesh".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::NODE_TABLE;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_depth, 3);
        assert_eq!(config.repairs.len(), 2);
    }

    #[test]
    fn history_depth_above_three_is_rejected() {
        let config = EngineConfig::new().with_history_depth(4);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
        assert!(EngineConfig::new().with_history_depth(0).validate().is_err());
    }

    #[test]
    fn toml_overrides_are_partial() {
        let config = EngineConfig::from_toml_str(
            r#"
            history_depth = 2
            repairs = ["default_created_at"]

            [tables]
            containers = "canvas_groups"
            "#,
        )
        .unwrap();

        assert_eq!(config.history_depth, 2);
        assert_eq!(config.repairs, vec!["default_created_at".to_string()]);
        assert_eq!(config.tables.containers, "canvas_groups");
        assert_eq!(config.tables.nodes, NODE_TABLE);
        assert_eq!(config.max_plan_mutations, DEFAULT_MAX_PLAN_MUTATIONS);
    }

    #[test]
    fn unknown_repair_names_survive_loading() {
        let config =
            EngineConfig::from_json_str(r#"{"repairs": ["auto_layout_position"]}"#).unwrap();
        assert_eq!(config.repairs, vec!["auto_layout_position".to_string()]);
    }

    #[test]
    fn parsers_report_documented_errors() {
        assert!(matches!(
            EngineConfig::from_toml_str("history_depth = ["),
            Err(CoreError::Toml(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("{"),
            Err(CoreError::Json(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("history_depth = 9"),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"history_depth": 0}"#),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = EngineConfig::load(Path::new("engine.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. } | CoreError::UnsupportedFormat(_)));
    }
}
