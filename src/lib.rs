//! Token-acquisition engine for a user-session OIDC agent: cached access tokens, four OAuth
//! grant drivers with ordered fallback, OIDC discovery, and in-memory credential lifetimes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod account;
pub mod discovery;
pub mod error;
pub mod flows;
pub mod http;
pub mod ipc;
pub mod lifetime;
pub mod obs;
pub mod token;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		account::{Account, AccountBuilder, AccountId},
		flows::Agent,
		http::ReqwestHttpClient,
	};

	/// Agent type alias used by reqwest-backed integration tests.
	pub type ReqwestTestAgent = Agent<ReqwestHttpClient>;

	/// Builds an agent backed by the default reqwest transport.
	pub fn build_test_agent() -> ReqwestTestAgent {
		Agent::with_http_client(ReqwestHttpClient::default())
	}

	/// Builder for a confidential-client account pointed at `issuer_url` (usually a mock
	/// issuer); tests append cached tokens or credentials before calling `build`.
	pub fn test_account(name: &str, issuer_url: &str) -> AccountBuilder {
		let name = AccountId::new(name).expect("Failed to build test account identifier.");
		let issuer = Url::parse(issuer_url).expect("Failed to parse test issuer URL.");

		Account::builder(name, issuer, "test-client").client_secret("test-secret")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {httpmock as _, oidc_agent_core as _, tokio as _};
