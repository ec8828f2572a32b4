//! Persisted OAuth token record, expiry helpers, and builder.

// self
use crate::{_prelude::*, auth::Secret};

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Access/refresh token pair with the expiry computed when it was issued.
///
/// `expires_at` is always `issued_at` plus the server-reported lifetime, or plus a
/// platform default when the server did not report one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: Secret,
	/// Refresh token secret, if the platform issued one.
	pub refresh_token: Option<Secret>,
	/// Instant the token was issued or refreshed.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Returns `true` when `instant` falls inside `buffer` of the expiry (or past it).
	pub fn needs_refresh_at(&self, instant: OffsetDateTime, buffer: Duration) -> bool {
		instant >= self.expires_at - buffer
	}

	/// Returns `true` when the record has fully expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Returns `true` when a refresh token is present and non-empty.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.is_empty())
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<Secret>,
	refresh_token: Option<Secret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<Secret>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<Secret>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Provides an optional refresh token value.
	pub fn maybe_refresh_token(mut self, token: Option<Secret>) -> Self {
		self.refresh_token = token;

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.is_empty())
			.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord { access_token, refresh_token: self.refresh_token, issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn safety_buffer_pulls_refresh_window_forward() {
		let record = TokenRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token record builder should succeed.");
		let buffer = Duration::minutes(5);

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert!(!record.needs_refresh_at(macros::datetime!(2025-01-01 00:54 UTC), buffer));
		assert!(record.needs_refresh_at(macros::datetime!(2025-01-01 00:55 UTC), buffer));
		assert!(!record.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(record.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert_eq!(
			record.remaining_at(macros::datetime!(2025-01-01 02:00 UTC)),
			Duration::ZERO
		);
		assert!(record.can_refresh());
	}

	#[test]
	fn builder_rejects_missing_fields() {
		assert_eq!(
			TokenRecord::builder().expires_in(Duration::hours(1)).build(),
			Err(TokenRecordBuilderError::MissingAccessToken)
		);
		assert_eq!(
			TokenRecord::builder().access_token("").expires_in(Duration::hours(1)).build(),
			Err(TokenRecordBuilderError::MissingAccessToken)
		);
		assert_eq!(
			TokenRecord::builder().access_token("a").build(),
			Err(TokenRecordBuilderError::MissingExpiry)
		);
	}

	#[test]
	fn records_persist_expiry_as_rfc3339() {
		let record = TokenRecord::builder()
			.access_token("a")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-08 00:00 UTC))
			.build()
			.expect("Token record builder should succeed.");
		let json = serde_json::to_string(&record).expect("Record should serialize.");

		assert!(json.contains("\"expires_at\":\"2025-01-08T00:00:00Z\""));

		let back: TokenRecord = serde_json::from_str(&json).expect("Record should deserialize.");

		assert_eq!(back, record);
	}
}
