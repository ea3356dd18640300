//! # zg-wasm-engine
//!
//! Runs zg guests on [wasmtime](https://wasmtime.dev/).
//!
//! The engine links the guest's flat `env` imports to the bridge crates:
//! GL calls go through [`zg_gl::GlBridge`], socket calls through
//! [`zg_net::SocketManager`], and the platform imports (`wasm_log_write`,
//! `wasm_panic`, `wasm_quit`, `now_f64`, screen size) are served here. Host
//! events are queued while the guest runs and delivered between calls.
//!
//! ## Example
//!
//! ```ignore
//! use zg_core::BridgeConfig;
//! use zg_gl::HeadlessDriver;
//! use zg_net::WsTransport;
//! use zg_wasm_engine::{BridgeRuntime, RunState};
//!
//! let config = BridgeConfig::load("zg.toml")?;
//! let runtime = BridgeRuntime::new(config)?;
//! let transport = Box::new(WsTransport::new(&runtime.config().socket));
//! let mut guest = runtime.load(wasm_bytes, HeadlessDriver::default(), transport)?;
//!
//! guest.call("app_init")?;
//! while guest.call("app_update")? == RunState::Running {
//!     guest.pump_events();
//! }
//! ```

mod console;
pub mod error;
mod gl_imports;
pub mod guest;
pub mod host;
pub mod runner;

pub use console::GuestConsole;
pub use error::{Error, Result};
pub use guest::{CallerGuest, StoreGuest};
pub use host::{BridgeState, HostFunctions};
pub use runner::{BridgeInstance, BridgeRuntime, RunState};
