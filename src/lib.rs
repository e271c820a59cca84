//! OAuth 2.0 protocol lab: chain JWT minting, token exchange, and bearer-grant calls through a
//! templated sub-function engine, with every outbound request rendered as `curl`.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod context;
pub mod engine;
pub mod error;
pub mod expr;
pub mod function;
#[cfg(feature = "reqwest")] pub mod http;
pub mod input;
pub mod obs;
#[cfg(feature = "server")] pub mod server;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value, json};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};

	/// JSON object used for inputs, outputs, and scopes.
	pub type JsonMap = Map<String, Value>;
}

pub use _prelude::JsonMap;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
#[cfg(test)] use {color_eyre as _, httpmock as _};
#[cfg(all(test, not(feature = "server")))] use tokio as _;
