//! Retrieval of entity documents.

pub mod http;

pub use http::HttpEntitySource;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{Catalog, EntityRecord};

/// Something that can produce the document for an entity name.
///
/// The HTTP implementation talks to the static data host; tests swap in
/// in-memory sources.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Fetch and decode the document for `entity`.
    async fn fetch_record(&self, entity: &str) -> Result<EntityRecord>;

    /// Fetch the merged catalog, if this source has one.
    async fn fetch_catalog(&self) -> Result<Option<Catalog>> {
        Ok(None)
    }
}
