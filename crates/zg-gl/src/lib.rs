//! # zg-gl
//!
//! WebGL2-style resource binding for the zg host bridge.
//!
//! Guest code refers to shaders, programs, buffers and other GPU objects by
//! small integer handles. [`GlBridge`] keeps one handle table per object kind,
//! translates handles to driver objects before every [`GpuDriver`] call and
//! mints new handles for objects the driver creates.
//!
//! ## Example
//!
//! ```
//! use zg_gl::{GlBridge, HeadlessDriver};
//!
//! let mut gl = GlBridge::new(HeadlessDriver::default());
//! let mut memory = vec![0u8; 64];
//!
//! gl.gen_buffers(&mut memory, 2, 16).unwrap();
//! assert_eq!(&memory[16..24], &[1, 0, 0, 0, 2, 0, 0, 0]);
//!
//! gl.bind_buffer(0x8892, 2).unwrap();
//! gl.bind_buffer(0x8892, 0).unwrap(); // unbind
//! assert!(gl.bind_buffer(0x8892, 7).is_err());
//! ```

mod bridge;
pub mod consts;
mod driver;
mod format;
mod headless;
mod ops;

pub use bridge::GlBridge;
pub use driver::{AttribPointer, GpuDriver, TexImage2D};
pub use format::{image_len, pixel_size};
pub use headless::{HeadlessDriver, ObjectId, CALL_HISTORY};
pub use ops::GlOp;
