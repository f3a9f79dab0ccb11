//! dsmz-lpsn - LPSN client
//!
//! Nomenclature searches against the List of Prokaryotic names with Standing
//! in Nomenclature, retrieved through the shared engine in `dsmz-core`.
//!
//! # Example
//!
//! ```no_run
//! use dsmz_lpsn::{Config, LpsnClient};
//!
//! let records = dsmz_core::block_on(async {
//!     let lpsn = LpsnClient::login(&Config::default(), "user", "password").await?;
//!     let search = lpsn
//!         .advanced_search([("taxon_name", "Escherichia"), ("is_legitimate", "true")])
//!         .await?;
//!     lpsn.retrieve(&search).await
//! })
//! .expect("retrieval failed");
//! println!("{} records", records.len());
//! ```

pub mod client;
pub mod config;
pub mod query;

// Re-exports
pub use client::LpsnClient;
pub use config::Config;
pub use query::{advanced_query, flexible_query};
