//! Redacting, zeroizing string for private keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// Secret text that is zeroed on drop and never printed.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret. Keep the returned slice out of logs.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// Runs `f` with the secret in scope only for the call.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SecretString(***REDACTED***)")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("***REDACTED***")
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str("***REDACTED***")
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_private_key_never_printed() {
		let key = SecretString::from("0xac0974bec39a17e36ba4a6b4d238ff944bacb478");
		assert_eq!(format!("{:?}", key), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", key), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&key).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_with_exposed() {
		let key = SecretString::from("abcd");
		assert_eq!(key.with_exposed(|s| s.len()), 4);
		assert_eq!(key.expose_secret(), "abcd");
		assert!(!key.is_empty());
	}
}
