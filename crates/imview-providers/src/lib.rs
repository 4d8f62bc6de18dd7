//! Backend adapters for hierarchical scientific datasets
//!
//! Three adapters expose the same [`DataProvider`] surface:
//!
//! - [`remote::RemoteApi`]: HTTP service speaking JSON metadata and
//!   binary value payloads
//! - [`embedded::EmbeddedApi`]: in-process engine over an in-memory
//!   snapshot buffer
//! - [`kernel::KernelApi`]: operations proxied through an interactive
//!   execution channel
//!
//! The shared semantics live outside the adapters: entity resolution
//! with one nesting level ([`resolver`]), per-session attribute value
//! memoization with request coalescing ([`cache`]), and last-request-wins
//! value fetches ([`fetcher`]). Adapters only translate wire shapes.

pub mod api;
pub mod cache;
pub mod embedded;
pub mod fetcher;
pub mod kernel;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod remote;
pub mod resolver;

pub use api::{AttrValues, DataProvider, ValueRequest};
pub use cache::AttributeCache;
pub use embedded::EmbeddedApi;
pub use fetcher::ValueFetcher;
pub use kernel::KernelApi;
pub use remote::RemoteApi;
pub use resolver::EntityResolver;
