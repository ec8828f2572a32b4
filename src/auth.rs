//! Auth-domain identifiers, credentials, secrets, and token records.

pub mod credentials;
pub mod id;
pub mod record;
pub mod secret;

pub use credentials::*;
pub use id::*;
pub use record::*;
pub use secret::*;
