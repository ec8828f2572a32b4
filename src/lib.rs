//! Signed, token-refreshing, paginated catalog ingestion for marketplace APIs.
//!
//! The crate covers the authenticated request path shared by the Lazada Open Platform
//! (Lazada and Redmart) and the Shopee Open Platform: HMAC request signatures, OAuth
//! token lifetime tracking with transparent refresh and persistence, and multi-page
//! fetch loops whose cursor semantics differ per platform.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authenticator;
pub mod catalog;
pub mod error;
pub mod http;
pub mod obs;
pub mod paginate;
pub mod platform;
pub mod settings;
pub mod sign;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
