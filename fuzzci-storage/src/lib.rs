//! Object storage access for fuzzer binaries and corpora.
//!
//! The storage client is an external collaborator: the pipeline only sees
//! the [`ObjectStore`] trait and is handed an instance explicitly.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod layout;
pub mod local;
pub mod store;

pub use error::StorageError;
pub use layout::{corpus_prefix, CORPUS_ARCHIVE_KEY};
pub use local::LocalObjectStore;
pub use store::ObjectStore;
