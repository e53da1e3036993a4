//! Registry configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty document is a valid
//! configuration:
//!
//! ```toml
//! label = "shell-tools"
//!
//! [family]
//! enabled = true
//! separators = [" ", "."]
//! max_differing_fields = 2
//! ```

use serde::{Deserialize, Serialize};

/// Number of descriptor fields that describe behavior (flags, risk, and three
/// performance classes). Identity hash and length are not counted.
pub const BEHAVIORAL_FIELDS: usize = 5;

/// Errors produced while loading or validating a [`RegistryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The document is not valid TOML or does not match the schema.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A field parsed but holds an unusable value.
	#[error("invalid value for '{field}': {reason}")]
	Invalid {
		/// Dotted path of the offending field.
		field: &'static str,
		reason: String,
	},
}

/// Top-level registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
	/// Name used in log events.
	pub label: String,
	pub family: FamilyConfig,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			label: "registry".to_owned(),
			family: FamilyConfig::default(),
		}
	}
}

/// When members of a command family are stored as deltas against a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FamilyConfig {
	/// Disabling stores every registration standalone, even when a parent exists.
	pub enabled: bool,
	/// Characters that split an identity into family and subcommand.
	pub separators: Vec<char>,
	/// Members differing from the parent in more behavioral fields are stored standalone.
	pub max_differing_fields: usize,
}

impl Default for FamilyConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			separators: vec![' ', '.'],
			max_differing_fields: 2,
		}
	}
}

impl RegistryConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks cross-field constraints that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.label.trim().is_empty() {
			return Err(ConfigError::Invalid {
				field: "label",
				reason: "must not be empty".to_owned(),
			});
		}

		let family = &self.family;
		if family.enabled && family.separators.is_empty() {
			return Err(ConfigError::Invalid {
				field: "family.separators",
				reason: "at least one separator is required when families are enabled".to_owned(),
			});
		}
		if let Some(c) = family.separators.iter().find(|c| c.is_alphanumeric()) {
			return Err(ConfigError::Invalid {
				field: "family.separators",
				reason: format!("'{c}' is alphanumeric"),
			});
		}
		if family.max_differing_fields > BEHAVIORAL_FIELDS {
			return Err(ConfigError::Invalid {
				field: "family.max_differing_fields",
				reason: format!(
					"{} exceeds the {BEHAVIORAL_FIELDS} behavioral fields",
					family.max_differing_fields
				),
			});
		}
		Ok(())
	}
}
