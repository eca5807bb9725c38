pub mod record_cache;

pub use record_cache::RecordCache;
