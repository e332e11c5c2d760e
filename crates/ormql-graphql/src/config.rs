//! Mapper configuration.
//!
//! Configuration can be embedded in an application's TOML file, typically
//! under an `[ormql]` section.
//!
//! # Example Configuration
//!
//! ```toml
//! [ormql]
//! unmapped_storage_types = "fail"
//! date_format = "[year]-[month]-[day] [hour]:[minute]:[second]"
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::schema::SchemaBuilderConfig;
use crate::types::DateFormat;

/// What to do with a field whose storage type has no scalar mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedTypePolicy {
    /// Abort the type with `MappingError::UnmappedStorageType`.
    Fail,
    /// Leave the field out of the type and log a warning.
    Omit,
}

/// Schema mapper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Policy for storage types missing from the coercion table.
    /// Default: fail
    #[serde(default = "default_unmapped_storage_types")]
    pub unmapped_storage_types: UnmappedTypePolicy,

    /// `time` format description used by the date, datetime and time coercions.
    /// Default: `[year]-[month]-[day] [hour]:[minute]:[second]`
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Maximum query depth of the exported schema.
    /// Default: 15
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity of the exported schema.
    /// Default: 500
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable introspection on the exported schema.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,
}

fn default_unmapped_storage_types() -> UnmappedTypePolicy {
    UnmappedTypePolicy::Fail
}

fn default_date_format() -> String {
    "[year]-[month]-[day] [hour]:[minute]:[second]".to_string()
}

fn default_max_depth() -> usize {
    15
}

fn default_max_complexity() -> usize {
    500
}

fn default_introspection() -> bool {
    true
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            unmapped_storage_types: default_unmapped_storage_types(),
            date_format: default_date_format(),
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_introspection(),
        }
    }
}

impl MapperConfig {
    /// Parses and validates a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::InvalidConfig` if the document does not parse
    /// or fails validation.
    pub fn from_toml_str(source: &str) -> Result<Self, MappingError> {
        let config: Self =
            toml::from_str(source).map_err(|e| MappingError::InvalidConfig(e.to_string()))?;
        config.validate().map_err(MappingError::InvalidConfig)?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("ormql.max_depth must be > 0".into());
        }
        if self.max_complexity == 0 {
            return Err("ormql.max_complexity must be > 0".into());
        }
        self.date_format()?;
        Ok(())
    }

    /// Parses [`date_format`](Self::date_format).
    ///
    /// # Errors
    ///
    /// Returns an error if the format description is malformed.
    pub fn date_format(&self) -> Result<DateFormat, String> {
        DateFormat::parse(&self.date_format)
            .map_err(|e| format!("ormql.date_format is invalid: {e}"))
    }

    /// Converts this config to a SchemaBuilderConfig.
    #[must_use]
    pub fn to_schema_builder_config(&self) -> SchemaBuilderConfig {
        SchemaBuilderConfig {
            max_depth: self.max_depth,
            max_complexity: self.max_complexity,
            introspection_enabled: self.introspection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapperConfig::default();
        assert_eq!(config.unmapped_storage_types, UnmappedTypePolicy::Fail);
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.max_complexity, 500);
        assert!(config.introspection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_max_depth() {
        let mut config = MapperConfig::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_date_format() {
        let mut config = MapperConfig::default();
        config.date_format = "[year".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            unmapped_storage_types = "omit"
            date_format = "[day]/[month]/[year]"
            max_depth = 20
            introspection = false
        "#;

        let config = MapperConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.unmapped_storage_types, UnmappedTypePolicy::Omit);
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.max_complexity, 500);
        assert!(!config.introspection);
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let err = MapperConfig::from_toml_str(r#"unmapped_storage_types = "ignore""#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_to_schema_builder_config() {
        let config = MapperConfig {
            introspection: false,
            ..MapperConfig::default()
        };
        let builder_config = config.to_schema_builder_config();
        assert_eq!(builder_config.max_depth, 15);
        assert!(!builder_config.introspection_enabled);
    }
}
