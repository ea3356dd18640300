//! # zg-core
//!
//! Guest-independent building blocks of the zg host bridge.
//!
//! This crate provides:
//! - Handle tables mapping dense numeric ids to host objects (id `0` is reserved)
//! - Typed views over guest linear memory, re-derived on every access
//! - UTF-8 and numeric array marshaling between guest memory and host types
//! - The host event types and the queue that carries them to the guest
//! - Bridge configuration loaded from TOML
//!
//! ## Example
//!
//! ```
//! use zg_core::{marshal, HandleTable, ResourceKind};
//!
//! let mut buffers = HandleTable::new(ResourceKind::Buffer);
//! let first = buffers.allocate("vertex data");
//! assert_eq!(first.get(), 1);
//!
//! let mut memory = vec![0u8; 64];
//! let written = marshal::write_utf8(&mut memory, 8, 4, 32, "hello").unwrap();
//! assert_eq!(written, 3);
//! assert_eq!(&memory[8..12], b"hel\0");
//! ```

mod config;
mod error;
pub mod event;
mod guest;
mod handle;
pub mod marshal;
pub mod memory;

pub use config::{BridgeConfig, GuestSection, LogSection, SocketSection};
pub use error::{Error, Result};
pub use event::{EventQueue, EventSink, HostEvent, InputEvent, Modifiers, SocketEvent};
pub use guest::{stage_bytes, GuestExport, GuestInstance};
pub use handle::{Handle, HandleTable, ResourceKind};
pub use memory::{Element, ElementKind, LinearMemory, View, ViewMut, WASM_PAGE_BYTES};
