//! Customer-action resolution and capture polling for card and alternative payments - drive 3DS2
//! fingerprints, challenges, and redirect flows to a new source token, then confirm asynchronous
//! captures with bounded, cancellable polling.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod action;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod flows;
pub mod gateway;
#[cfg(feature = "reqwest")] pub mod http;
pub mod obs;
pub mod resolver;
pub mod retry;
pub mod threeds;
pub mod web;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::{Mutex as AsyncMutex, Semaphore};
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use tokio::time::Instant;
	pub use url::Url;

	pub use crate::error::{Error, FailureCode, FailureScope, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(not(feature = "reqwest"))] use rand as _;
#[cfg(test)] use {color_eyre as _, httpmock as _};
