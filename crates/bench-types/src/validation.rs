//! Schema validation for protocol configuration tables.
//!
//! Each aggregator plugin describes its `[protocols.<name>]` table with a
//! [`Schema`], which is checked before the plugin is constructed.

use alloy::primitives::Address;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, PartialEq)]
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
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	/// Floats also accept integer literals.
	Float,
	Boolean,
	Array(Box<FieldType>),
	Table(Schema),
}

pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

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

	/// String field that must be an `http(s)://` URL.
	pub fn url(name: impl Into<String>) -> Self {
		Self::new(name, FieldType::String).with_validator(|value| {
			let url = value.as_str().unwrap_or_default();
			if url.starts_with("http://") || url.starts_with("https://") {
				Ok(())
			} else {
				Err("URL must start with http:// or https://".to_string())
			}
		})
	}

	/// String field that must parse as a 20-byte hex address.
	pub fn address(name: impl Into<String>) -> Self {
		Self::new(name, FieldType::String).with_validator(|value| {
			value
				.as_str()
				.unwrap_or_default()
				.parse::<Address>()
				.map(|_| ())
				.map_err(|_| "must be a valid Ethereum address".to_string())
		})
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

/// Schema definition with required and optional fields.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema. Unknown keys are allowed.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

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

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String if !value.is_str() => Err(mismatch(field_name, "string", value)),
		FieldType::Boolean if !value.is_bool() => Err(mismatch(field_name, "boolean", value)),
		FieldType::Float if !(value.is_float() || value.is_integer()) => {
			Err(mismatch(field_name, "float", value))
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min.filter(|m| int_val < *m) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is less than minimum {}", int_val, min_val),
				});
			}
			if let Some(max_val) = max.filter(|m| int_val > *m) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is greater than maximum {}", int_val, max_val),
				});
			}
			Ok(())
		}
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
			Ok(())
		}
		FieldType::Table(schema) => schema.validate(value).map_err(|e| match e {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", field_name, f))
			}
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", field_name, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", field_name, field),
				expected,
				actual,
			},
		}),
		_ => Ok(()),
	}
}

/// A configuration schema that can validate a plugin's TOML table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::url("base_url")],
			vec![
				Field::new(
					"poll_attempts",
					FieldType::Integer {
						min: Some(1),
						max: Some(600),
					},
				),
				Field::new("fee_tiers", FieldType::Array(Box::new(FieldType::Integer { min: None, max: None }))),
				Field::address("settlement"),
			],
		)
	}

	#[test]
	fn test_valid_table_passes() {
		let config: toml::Value = toml::from_str(
			r#"
base_url = "https://staging.li.quest/v1"
poll_attempts = 30
fee_tiers = [500, 3000]
settlement = "0x9008D19f58AAbD9eD0D60971565AA8510560ab41"
"#,
		)
		.unwrap();

		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let config: toml::Value = toml::from_str("poll_attempts = 3").unwrap();
		assert_eq!(
			schema().validate(&config),
			Err(ValidationError::MissingField("base_url".to_string()))
		);
	}

	#[test]
	fn test_out_of_range_and_bad_items() {
		let config: toml::Value =
			toml::from_str("base_url = \"https://x\"\npoll_attempts = 0").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "poll_attempts"
		));

		let config: toml::Value =
			toml::from_str("base_url = \"https://x\"\nfee_tiers = [500, \"high\"]").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch { field, .. }) if field == "fee_tiers[1]"
		));
	}

	#[test]
	fn test_url_and_address_validators() {
		let config: toml::Value = toml::from_str("base_url = \"ftp://x\"").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "base_url"
		));

		let config: toml::Value =
			toml::from_str("base_url = \"https://x\"\nsettlement = \"0x1234\"").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "settlement"
		));
	}
}
