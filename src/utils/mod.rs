// URL handling utilities
pub mod url_builder;
pub mod url_encoding;

// Re-export all utilities for convenient access
pub use url_builder::absolute_url;
pub use url_encoding::{first_values, parse_urlencoded_body};
