use thiserror::Error;

/// Errors from the wasm host.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Compilation, linking or execution error raised by wasmtime.
    #[error("WASM error: {0}")]
    Wasm(String),

    /// Bridge error outside of any particular import.
    #[error("Bridge error: {0}")]
    Bridge(#[from] zg_core::Error),

    /// A host import failed and trapped the guest.
    #[error("{import} failed: {source}")]
    Import {
        import: &'static str,
        #[source]
        source: zg_core::Error,
    },

    /// The guest called `wasm_panic`.
    #[error("guest panicked: {0}")]
    GuestPanic(String),

    /// Invalid input parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Wrap a bridge error raised while serving `import`.
    pub(crate) fn import(import: &'static str, source: zg_core::Error) -> Self {
        Error::Import { import, source }
    }

    /// The underlying bridge error, if any.
    pub fn bridge_error(&self) -> Option<&zg_core::Error> {
        match self {
            Error::Bridge(err) | Error::Import { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

/// Result type for zg-wasm-engine operations.
pub type Result<T> = std::result::Result<T, Error>;
