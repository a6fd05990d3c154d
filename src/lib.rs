//! The whereis library: approximate location lookups for IP addresses.
//!
//! Addresses are resolved against the Fastah "whereis" HTTP API and,
//! optionally, cross-checked against a local MaxMind City database. Each
//! valid input address becomes one row of a text table.
//!
//! # Examples
//!
//! ```rust,no_run
//! use whereis::{BatchLookup, FastahClient, DEFAULT_ENDPOINT};
//!
//! # fn main() -> whereis::Result<()> {
//! let client = FastahClient::new("my-api-key", DEFAULT_ENDPOINT)?;
//! let report = BatchLookup::new(&client, None).run(&b"8.8.8.8\n1.1.1.1\n"[..])?;
//! println!("{}", report.table.render());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod input;
pub mod local;
pub mod location;
pub mod logging;
pub mod remote;
pub mod table;

pub use crate::batch::{BatchLookup, BatchReport, BatchSummary};
pub use crate::config::{ConfigStore, Settings};
pub use crate::error::{Error, Result};
pub use crate::local::{CityDatabase, CompareMode, LocalLookup};
pub use crate::location::{LocationRecord, SENTINEL};
pub use crate::remote::{FastahClient, RemoteLookup, RemoteOutcome, DEFAULT_ENDPOINT};
pub use crate::table::{Layout, ResultRow, ResultTable};
