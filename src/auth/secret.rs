//! Redacting wrapper for app secrets, partner keys, and OAuth tokens.

// self
use crate::_prelude::*;

/// Sensitive string that never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Secret(<redacted>)")
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_redact_but_serde_keeps_value() {
		let secret = Secret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "Secret(<redacted>)");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(
			serde_json::to_string(&secret).expect("Secret should serialize."),
			"\"super-secret\""
		);
	}
}
