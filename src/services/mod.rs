pub mod content_store;

// Re-export commonly used items
pub use content_store::{now_iso8601, slugify, ContentStore, StoreError, Transaction};
