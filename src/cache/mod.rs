//! In-memory caching of decoded results.
//!
//! This module is independent of the API being called:
//! - [`CacheKey`] identifies a result by method, canonical address and
//!   decode target type
//! - [`CachePolicy`] makes expiry and capacity explicit configuration
//! - [`MemoryStorage`] holds type-erased values and applies the policy

mod key;
mod policy;
mod storage;

pub use key::CacheKey;
pub use policy::{CachePolicy, Expiry};
pub use storage::MemoryStorage;
