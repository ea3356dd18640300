use crate::handle::ResourceKind;
use thiserror::Error;

/// Errors raised while servicing a guest request or delivering a host event.
#[derive(Debug, Error)]
pub enum Error {
    /// The handle is 0, was never allocated, or has been deleted.
    #[error("invalid {kind} handle: {handle}")]
    InvalidHandle {
        /// Table the handle was looked up in.
        kind: ResourceKind,
        /// Raw handle value passed by the guest.
        handle: u32,
    },

    /// A pointer/length pair falls outside the current guest memory.
    #[error("guest memory access out of range: offset {offset}, length {len}, memory size {size}")]
    OutOfRange {
        /// Start of the requested range.
        offset: u64,
        /// Requested length in bytes.
        len: u64,
        /// Guest memory size at the time of the access.
        size: u64,
    },

    /// The operation is known but not wired to the driver.
    #[error("operation not implemented: {0}")]
    NotImplemented(&'static str),

    /// A guest allocator returned the null address.
    #[error("guest allocator returned null for {len} bytes")]
    AllocationFailure {
        /// Number of bytes requested.
        len: u32,
    },

    /// The driver call was given a data shape the bridge cannot size.
    #[error("unsupported pixel format {format:#06x} with type {ty:#06x}")]
    UnsupportedFormat {
        /// Pixel format enum.
        format: u32,
        /// Component type enum.
        ty: u32,
    },

    /// One or more elements of a batch operation failed.
    #[error("{kind} batch failed for handles {failed:?}")]
    BatchFailed {
        /// Table the batch operated on.
        kind: ResourceKind,
        /// Raw handle values that could not be processed.
        failed: Vec<u32>,
    },

    /// A required guest export is missing or has the wrong type.
    #[error("guest export unavailable: {0}")]
    MissingExport(String),

    /// The guest trapped or returned something unusable.
    #[error("guest call failed: {0}")]
    Guest(String),

    /// A socket transport could not be set up or used.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for zg-core operations.
pub type Result<T> = std::result::Result<T, Error>;
