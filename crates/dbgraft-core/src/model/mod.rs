//! Shared model types for stores, probes and query results

pub mod probe;
pub mod query;
pub mod store;

pub use probe::RowProbe;
pub use query::QueryResult;
pub use store::{OpenMode, StoreLocation, StoreSpec, MEMORY_SENTINEL};
