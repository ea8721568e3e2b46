//! Azure AD session management: one signed-in account per manager, bearer tokens acquired
//! through an ordered silent → popup → redirect plan, a request wrapper that retries exactly
//! once on 401, and the bearer-protected data API those requests reach.

#![deny(clippy::all, unused_crate_dependencies)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod inspect;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(feature = "server")] pub mod server;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::{Mutex as AsyncMutex, OnceCell as AsyncOnceCell};
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
