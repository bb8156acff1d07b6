//! String formatting utilities.
//!
//! Hex prefix handling, id truncation for logs, and conversion between wei
//! and the decimal strings players type and read.

use alloy_primitives::{
	utils::{parse_units, ParseUnits},
	Address, U256,
};
use thiserror::Error;

/// Errors from parsing a user-entered native amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
	#[error("Invalid amount: {0}")]
	Invalid(String),
	#[error("Amount must not be negative")]
	Negative,
}

/// Truncates a hex string to its first 8 characters for logging.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Adds a "0x" prefix unless one is already present.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Strips a "0x" or "0X" prefix if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Shortens an address to `0x1234...abcd` for display.
pub fn short_address(address: &Address) -> String {
	let full = address.to_string();
	format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Formats a wei amount as a decimal string without trailing zeros.
///
/// `1500000000000000000` with 18 decimals renders as `1.5`.
pub fn format_native_amount(amount: U256, decimals: u8) -> String {
	let raw = amount.to_string();
	if decimals == 0 {
		return raw;
	}
	let places = decimals as usize;

	let (integer_part, decimal_part) = if raw.len() <= places {
		("0".to_string(), format!("{:0>width$}", raw, width = places))
	} else {
		let split = raw.len() - places;
		(raw[..split].to_string(), raw[split..].to_string())
	};

	let trimmed = decimal_part.trim_end_matches('0');
	if trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, trimmed)
	}
}

/// Parses a decimal amount such as `0.05` into wei.
pub fn parse_native_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
	let parsed = parse_units(amount.trim(), decimals)
		.map_err(|e| AmountError::Invalid(format!("{}: {}", amount, e)))?;
	match parsed {
		ParseUnits::U256(value) => Ok(value),
		ParseUnits::I256(value) if value.is_negative() => Err(AmountError::Negative),
		ParseUnits::I256(value) => Ok(value.into_raw()),
	}
}
