//! Error types for bucketsync-store.

use thiserror::Error;

/// All errors an [`crate::ObjectStore`] implementation can return.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced an HTTP response (DNS, refused, TLS, ...).
    #[error("cannot reach object store: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("object store returned HTTP {status}{}: {message}", fmt_code(.code))]
    Status {
        status: u16,
        /// Service error code from the XML error body, e.g. `NoSuchKey`.
        code: Option<String>,
        message: String,
    },

    #[error("bucket not found: {0}")]
    NoSuchBucket(String),

    #[error("object not found: s3://{bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// A response that could not be understood.
    #[error("malformed object store response: {0}")]
    Protocol(String),

    #[error("XML decode error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Endpoint, region or credential settings that cannot produce a client.
    #[error("invalid store settings: {0}")]
    Settings(String),

    /// Failure raised on purpose by [`crate::MemoryStore`].
    #[error("injected failure: {0}")]
    Injected(String),
}

fn fmt_code(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}
