//! dsmz-bacdive - BacDive client
//!
//! Strain-level searches (culture collection number, taxonomy, 16S and genome
//! accessions) on top of the shared retrieval engine in `dsmz-core`.

pub mod client;
pub mod config;
pub mod query;

// Re-exports
pub use client::BacdiveClient;
pub use config::Config;
pub use query::{culture_collection_query, genome_query, sequence_16s_query, taxonomy_query};
