pub mod document;
pub mod facts;
pub mod text;
pub mod types;

// Re-export the extraction surface
pub use self::types::{BroadcastRow, Dialect, DocumentMeta, PerFactRow, Resolved};
