//! Imagegen - Core Library
//!
//! Model configuration, the generation-and-persistence pipeline and the
//! gallery indexer over the on-disk artifact store.

pub mod config;
pub mod error;
pub mod gallery;
pub mod naming;
pub mod service;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::*;
pub use error::*;
pub use gallery::*;
pub use service::*;
pub use types::*;
pub use writer::*;
