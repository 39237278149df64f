//! Typed, cached loading of resources from a JSON REST API.
//!
//! A [`Resource`] describes what to fetch and how to decode it. A
//! [`Webservice`] loads resources, serving repeated requests from an
//! in-memory cache and merging concurrent identical requests into one fetch.
//! Results arrive through a [`Pending`] handle.
//!
//! ```ignore
//! let webservice = Webservice::builder()
//!     .provider(UrlProvider::new("jsonplaceholder.typicode.com")?)
//!     .build()?;
//!
//! let users = webservice.load(&User::all()).wait().await?;
//! let albums = webservice.load(&users[0].albums()).wait().await?;
//! ```

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod logging;
pub mod model;
pub mod pending;
pub mod resource;
pub mod route;
pub mod webservice;

pub use cache::{CachePolicy, Expiry};
pub use decode::{Decodable, DecodeError, DecodeErrorKind, JsonObject};
pub use error::{ConfigError, LoadError, NetworkError};
pub use pending::{LoadResult, Pending, SubscriptionId};
pub use resource::{Image, Resource};
pub use route::{Route, UrlProvider};
pub use webservice::{FetchRequest, HttpTransport, Transport, Webservice, WebserviceBuilder};
