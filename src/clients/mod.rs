pub mod job_store;
pub mod jsearch_client;

pub use job_store::{JobStore, MemoryJobStore};
pub use jsearch_client::JSearchClient;
