//! # bucketsync-store
//!
//! The object-store side of a sync: the [`ObjectStore`] trait the pipeline is
//! written against, an S3-compatible HTTP implementation ([`S3Store`]) and an
//! in-memory implementation ([`MemoryStore`]) for tests and embedding.

pub mod error;
pub mod memory;
pub mod s3;
pub mod settings;
pub mod sigv4;
pub mod store;

pub use error::StoreError;
pub use memory::{Fault, MemoryStore, Operation};
pub use s3::S3Store;
pub use settings::{S3Settings, StoreOverrides};
pub use sigv4::Credentials;
pub use store::{ListPage, ObjectReader, ObjectStore, ObjectSummary};
