//! Validation of implementation-specific configuration tables.
//!
//! Endpoint and wallet implementations each describe the TOML table they
//! accept as a [`Schema`]. The factories validate their table before building
//! anything so a bad config fails at startup with a field path.

use alloy_primitives::Address;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Boolean,
	/// A string holding a 20-byte hex address.
	Address,
	/// A string starting with `http://` or `https://`.
	Url,
	Table(Schema),
}

/// Extra check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field of a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Checks presence of required fields, then every present field's type
	/// and custom validator. Nested tables are checked recursively.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| mismatch("root", "table", config))?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn invalid(field: &str, message: String) -> ValidationError {
	ValidationError::InvalidValue {
		field: field.to_string(),
		message,
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "string", value))?;
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;
			if let Some(min_val) = min.filter(|m| int_val < *m) {
				return Err(invalid(
					field_name,
					format!("Value {} is less than minimum {}", int_val, min_val),
				));
			}
			if let Some(max_val) = max.filter(|m| int_val > *m) {
				return Err(invalid(
					field_name,
					format!("Value {} is greater than maximum {}", int_val, max_val),
				));
			}
		},
		FieldType::Boolean => {
			value
				.as_bool()
				.ok_or_else(|| mismatch(field_name, "boolean", value))?;
		},
		FieldType::Address => {
			let s = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "address string", value))?;
			Address::from_str(s)
				.map_err(|e| invalid(field_name, format!("Invalid address '{}': {}", s, e)))?;
		},
		FieldType::Url => {
			let s = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "url string", value))?;
			if !(s.starts_with("http://") || s.starts_with("https://")) {
				return Err(invalid(
					field_name,
					format!("'{}' must start with http:// or https://", s),
				));
			}
		},
		FieldType::Table(schema) => {
			schema
				.validate(value)
				.map_err(|e| prefix_field(field_name, e))?;
		},
	}

	Ok(())
}

fn prefix_field(parent: &str, error: ValidationError) -> ValidationError {
	match error {
		ValidationError::MissingField(f) => ValidationError::MissingField(format!("{}.{}", parent, f)),
		ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
			field: format!("{}.{}", parent, field),
			message,
		},
		ValidationError::TypeMismatch {
			field,
			expected,
			actual,
		} => ValidationError::TypeMismatch {
			field: format!("{}.{}", parent, field),
			expected,
			actual,
		},
		other => other,
	}
}

/// A configuration schema an implementation exposes for its TOML table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
