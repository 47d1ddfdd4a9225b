//! Catalog client traits and their HTTP-backed implementations, modeled on
//! the `catalog_sync` workers: a `reqwest::Client`, a token cache guarded by
//! `RwLock`, and an `api_request<T>` helper that waits on rate limiting,
//! ensures a valid token, and deserializes a JSON response.

mod source;
mod target;
mod universal_link;

pub use source::{HttpSourceCatalogClient, SourceCatalogClient};
pub use target::{HttpTargetCatalogClient, PlaylistSnapshot, PlaylistSummary, TargetCatalogClient};
pub use universal_link::{HttpUniversalLinkClient, UniversalLinkClient};
