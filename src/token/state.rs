//! Explicit token state machine and the one-shot store reconciliation.

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenRecord},
};

/// Observable state of a manager's token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenState {
	/// No access token is known.
	NoToken,
	/// The access token is outside the safety buffer of its expiry.
	Valid,
	/// The access token is inside the safety buffer or past its expiry.
	Expired,
	/// A refresh call is in flight.
	Refreshing,
}
impl TokenState {
	/// Stable label for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::NoToken => "no_token",
			Self::Valid => "valid",
			Self::Expired => "expired",
			Self::Refreshing => "refreshing",
		}
	}
}
impl Display for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Whether the persisted record has been consulted yet. Happens at most once per manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreLookup {
	/// Not consulted yet.
	#[default]
	Pending,
	/// Consulted (or no store configured).
	Done,
}

/// What the store lookup changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciled {
	/// A fresher, non-expired stored record replaced the in-memory token.
	Adopted,
	/// An expired stored record contributed its refresh token.
	RefreshTokenAdopted,
	/// Nothing changed.
	Kept,
}

/// Mutable token slot guarded by the manager.
#[derive(Clone, Debug, Default)]
pub(crate) struct TokenSlot {
	pub(crate) record: Option<TokenRecord>,
	/// Refresh token known without an access token.
	pub(crate) seed_refresh: Option<Secret>,
	pub(crate) refreshing: bool,
	pub(crate) lookup: StoreLookup,
}
impl TokenSlot {
	pub(crate) fn new(record: Option<TokenRecord>, seed_refresh: Option<Secret>) -> Self {
		Self { record, seed_refresh, refreshing: false, lookup: StoreLookup::Pending }
	}

	pub(crate) fn state_at(&self, now: OffsetDateTime, buffer: Duration) -> TokenState {
		if self.refreshing {
			return TokenState::Refreshing;
		}

		match &self.record {
			None => TokenState::NoToken,
			Some(record) if record.needs_refresh_at(now, buffer) => TokenState::Expired,
			Some(_) => TokenState::Valid,
		}
	}

	pub(crate) fn refresh_token(&self) -> Option<Secret> {
		self.record
			.as_ref()
			.and_then(|record| record.refresh_token.clone())
			.or_else(|| self.seed_refresh.clone())
			.filter(|secret| !secret.is_empty())
	}

	pub(crate) fn access_token(&self) -> Option<Secret> {
		self.record.as_ref().map(|record| record.access_token.clone())
	}

	/// Applies a stored record. Marks the lookup as done.
	pub(crate) fn reconcile(
		&mut self,
		stored: Option<TokenRecord>,
		now: OffsetDateTime,
		buffer: Duration,
	) -> Reconciled {
		self.lookup = StoreLookup::Done;

		let Some(stored) = stored else {
			return Reconciled::Kept;
		};

		if !stored.needs_refresh_at(now, buffer) {
			let fresher = self.record.as_ref().is_none_or(|current| {
				current.needs_refresh_at(now, buffer) || stored.expires_at > current.expires_at
			});

			if fresher {
				self.record = Some(stored);

				return Reconciled::Adopted;
			}

			return Reconciled::Kept;
		}

		match (stored.refresh_token.filter(|secret| !secret.is_empty()), self.record.as_mut()) {
			(Some(refresh), Some(current)) => {
				current.refresh_token = Some(refresh);

				Reconciled::RefreshTokenAdopted
			},
			(Some(refresh), None) => {
				self.seed_refresh = Some(refresh);

				Reconciled::RefreshTokenAdopted
			},
			(None, _) => Reconciled::Kept,
		}
	}

	pub(crate) fn begin_refresh(&mut self) {
		self.refreshing = true;
	}

	/// Ends a refresh. On failure the previous token stays in place.
	pub(crate) fn finish_refresh(&mut self, refreshed: Option<TokenRecord>) {
		self.refreshing = false;

		if let Some(record) = refreshed {
			self.record = Some(record);
			self.seed_refresh = None;
		}
	}
}
