use crate::memory::write_bytes;
use crate::{Error, Result};

/// Guest entry points the bridge calls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestExport {
    /// `(len) -> ptr` allocator for inbound socket payloads.
    SocketAlloc,
    SocketOpen,
    SocketMessage,
    SocketClose,
    SocketError,
    MouseDown,
    MouseUp,
    MouseMotion,
    KeyDown,
    KeyUp,
    TextInput,
    /// `(len) -> ptr` allocator for strings returned by driver queries.
    StringAlloc,
}

impl GuestExport {
    /// Export name looked up on the guest instance.
    pub fn symbol(self) -> &'static str {
        match self {
            GuestExport::SocketAlloc => "app_socket_alloc",
            GuestExport::SocketOpen => "app_socket_onOpen",
            GuestExport::SocketMessage => "app_socket_onMessage",
            GuestExport::SocketClose => "app_socket_onClose",
            GuestExport::SocketError => "app_socket_onError",
            GuestExport::MouseDown => "app_input_sendMouseDown",
            GuestExport::MouseUp => "app_input_sendMouseUp",
            GuestExport::MouseMotion => "app_input_sendMouseMotion",
            GuestExport::KeyDown => "app_input_sendKeyDown",
            GuestExport::KeyUp => "app_input_sendKeyUp",
            GuestExport::TextInput => "app_input_sendTextInput",
            GuestExport::StringAlloc => "getString_alloc",
        }
    }
}

/// A live guest instance as seen by the bridge.
pub trait GuestInstance {
    /// The guest's linear memory, fetched from the instance on every call.
    fn memory(&mut self) -> Result<&mut [u8]>;

    /// Call an exported entry point with `i32` arguments. Returns the first
    /// result, if the export has one.
    fn invoke(&mut self, export: GuestExport, args: &[i32]) -> Result<Option<i32>>;
}

/// Allocate `bytes.len()` bytes through the guest allocator `allocator` and
/// copy `bytes` there. Returns the guest address.
///
/// The allocator may grow guest memory, so the memory slice is fetched only
/// after it returns.
pub fn stage_bytes<G>(guest: &mut G, allocator: GuestExport, bytes: &[u8]) -> Result<u32>
where
    G: GuestInstance + ?Sized,
{
    let len = u32::try_from(bytes.len()).map_err(|_| Error::AllocationFailure { len: u32::MAX })?;
    let ptr = guest
        .invoke(allocator, &[len as i32])?
        .ok_or_else(|| Error::MissingExport(format!("{} returned no address", allocator.symbol())))?
        as u32;
    if ptr == 0 {
        return Err(Error::AllocationFailure { len });
    }

    write_bytes(guest.memory()?, ptr, bytes)?;
    Ok(ptr)
}
