//! Precomputed pairwise similarity lookups.
//!
//! # Architecture
//!
//! - `ident`: bare <-> qualified identifier conversion per partition
//! - `store`: similarity file parsing into an immutable pair store
//! - `query`: neighbor lookup over a loaded store
//! - `cache`: process-wide store cache keyed by partition

mod cache;
pub mod ident;
mod query;
mod store;

pub use cache::StoreCache;
pub use ident::PartitionPrefix;
pub use query::{neighbors, Neighbor};
pub use store::PairStore;
