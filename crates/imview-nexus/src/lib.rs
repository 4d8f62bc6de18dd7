//! imview-nexus - NeXus semantic resolution
//!
//! Interprets NeXus annotation attributes on top of any
//! [`DataProvider`](imview_providers::DataProvider):
//!
//! - **NexusResolver**: chases `default` redirections and assembles the
//!   signal, axes, auxiliary signals, errors, and styling of a group
//! - **NxData**: the resolved plot model handed to consumers
//! - **ErrorsConvention**: pluggable naming scheme for companion error
//!   datasets

pub mod models;
pub mod resolve;

pub use models::{DatasetDef, NxData, NxInterpretation, ScaleType, SilxStyle};
pub use resolve::{ErrorsConvention, NexusResolver, SuffixConvention};
