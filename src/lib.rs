//! # Terrastore Rust client
//!
//! A blocking client for the Terrastore distributed document store, speaking
//! its HTTP/JSON protocol.
//!
//! ## Features
//!
//! - **Failover**: ordered host lists with sticky failover on connectivity errors
//! - **Typed errors**: missing keys and failed conditions are distinct variants
//! - **Pluggable codecs**: register JSON descriptors for your own value types
//! - **Full protocol**: buckets, values, range and predicate queries, updates,
//!   merges, map-reduce, backups and cluster stats
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use terrastore_client::TerrastoreClient;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct TestValue {
//!     value: String,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TerrastoreClient::ordered(&["http://localhost:8080", "http://localhost:8081"])?;
//!     let bucket = client.bucket("bucket");
//!
//!     bucket.key("key1").put(&TestValue { value: "value1".to_string() })?;
//!     let stored: TestValue = bucket.key("key1").get()?;
//!     println!("Retrieved {:?}", stored);
//!
//!     let values = bucket.range("key1").to("key9").limit(10).get::<TestValue>()?;
//!     for (key, value) in values.iter() {
//!         println!("{} => {}", key, value.value);
//!     }
//!
//!     bucket.remove()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Handling errors
//!
//! ```no_run
//! use terrastore_client::{Error, TerrastoreClient};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TerrastoreClient::new("http://localhost:8080")?;
//! match client.bucket("bucket").key("missing").get::<serde_json::Value>() {
//!     Err(Error::KeyNotFound { message, .. }) => println!("no such key: {}", message),
//!     Err(err) if err.is_connectivity() => println!("cluster unreachable: {}", err),
//!     other => println!("{:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod error_translator;
pub mod host;
pub mod types;

// Re-export main types for convenience
pub use client::{BucketOperation, KeyOperation, RangeOperation, TerrastoreClient, UpdateOperation};
pub use codec::{CodecRegistry, JsonDescriptor, JsonObjectDescriptor};
pub use config::{ClientConfig, HostPolicy};
pub use connection::{Connection, ConnectionFactory, HttpConnectionFactory};
pub use error::{Error, Result};
pub use host::{Host, HostManager, OrderedHostManager, SingleHostManager};
pub use types::*;
