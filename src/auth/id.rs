//! Validated platform identifier used to key token persistence.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const IDENTIFIER_MAX_LEN: usize = 64;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Platform name cannot be empty.")]
	Empty,
	/// The identifier contains characters outside `[a-z0-9_-]`.
	#[error("Platform name `{value}` must only contain lowercase ASCII letters, digits, `-`, or `_`.")]
	InvalidCharacter {
		/// Rejected value.
		value: String,
	},
	/// The identifier exceeded the allowed character count.
	#[error("Platform name exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Name under which a platform's token record is persisted (e.g. `lazada`, `shopee`).
///
/// Two managers built with the same name share one persisted record, so callers must
/// not run them concurrently.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformName(String);
impl PlatformName {
	/// Creates a new validated platform name.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the name as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for PlatformName {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for PlatformName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for PlatformName {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<PlatformName> for String {
	fn from(value: PlatformName) -> Self {
		value.0
	}
}
impl TryFrom<String> for PlatformName {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for PlatformName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Platform({})", self.0)
	}
}
impl Display for PlatformName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for PlatformName {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if !view.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
	{
		return Err(IdentifierError::InvalidCharacter { value: view.to_owned() });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn platform_names_reject_whitespace_and_uppercase() {
		assert!(PlatformName::new(" lazada").is_err());
		assert!(PlatformName::new("Lazada").is_err());
		assert_eq!(PlatformName::new(""), Err(IdentifierError::Empty));

		let name = PlatformName::new("lazada_sg").expect("Platform fixture should be valid.");

		assert_eq!(name.as_str(), "lazada_sg");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let name: PlatformName =
			serde_json::from_str("\"shopee\"").expect("Platform should deserialize successfully.");

		assert_eq!(name.as_ref(), "shopee");
		assert!(serde_json::from_str::<PlatformName>("\"with space\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<PlatformName, u8> = HashMap::from_iter([(
			PlatformName::new("redmart").expect("Platform used for lookup should be valid."),
			3_u8,
		)]);

		assert_eq!(map.get("redmart"), Some(&3));
		assert!("a".repeat(IDENTIFIER_MAX_LEN + 1).parse::<PlatformName>().is_err());
	}
}
