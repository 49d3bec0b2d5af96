//! In-memory expansion cache
//!
//! Entries are keyed by the include path as it was requested (not the
//! resolved file) and are reused only while neither the file nor anything it
//! includes has a newer timestamp than the one recorded when the entry was
//! built.

mod entry;
mod store;

pub use entry::{CacheEntry, IncludedFile};
pub use store::SourceCache;
