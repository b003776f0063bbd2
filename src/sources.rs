//! Medical reference sources
//!
//! The allow-listed catalog, keyword routing from a question to one source,
//! and the bounded fetcher that turns a source page into plain text.

mod catalog;
mod fetcher;
mod html;
mod router;

pub use catalog::{Source, SourceCatalog};
pub use fetcher::{ContentFetcher, FetchSettings, HttpFetcher, ReqwestFetcher};
#[cfg(test)]
pub use fetcher::{HttpResponse, TransportError};
pub use router::{KeywordGroup, SourceRouter};
