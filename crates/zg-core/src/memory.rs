//! Typed views over guest linear memory.
//!
//! A view only ever borrows the memory slice it was built from. Anything that
//! can grow guest memory (calling into the guest, including the bridge's own
//! allocator calls) needs exclusive access to the instance, so the borrow
//! checker rejects a view that outlives such a call. Callers re-derive the
//! slice from the live instance for every operation.

use crate::{Error, Result};
use std::marker::PhantomData;
use std::ops::Range;

/// Size of one WebAssembly memory page.
pub const WASM_PAGE_BYTES: usize = 64 * 1024;

/// Primitive element types that can be viewed in guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    U8,
    U32,
    I32,
    F32,
}

impl ElementKind {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementKind::U8 => 1,
            ElementKind::U32 | ElementKind::I32 | ElementKind::F32 => 4,
        }
    }
}

/// A value stored little-endian in guest memory.
pub trait Element: Copy + 'static {
    const KIND: ElementKind;

    fn decode(bytes: &[u8]) -> Self;

    fn encode(self, out: &mut [u8]);
}

impl Element for u8 {
    const KIND: ElementKind = ElementKind::U8;

    fn decode(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn encode(self, out: &mut [u8]) {
        out[0] = self;
    }
}

macro_rules! le_element {
    ($ty:ty, $kind:expr) => {
        impl Element for $ty {
            const KIND: ElementKind = $kind;

            fn decode(bytes: &[u8]) -> Self {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&bytes[..4]);
                <$ty>::from_le_bytes(raw)
            }

            fn encode(self, out: &mut [u8]) {
                out[..4].copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

le_element!(u32, ElementKind::U32);
le_element!(i32, ElementKind::I32);
le_element!(f32, ElementKind::F32);

/// Byte range covered by `count` elements of `kind` at `offset`, checked
/// against the current memory size.
pub fn byte_range(
    memory_len: usize,
    offset: u32,
    count: u32,
    kind: ElementKind,
) -> Result<Range<usize>> {
    let len = u64::from(count) * kind.size() as u64;
    let start = u64::from(offset);
    let size = memory_len as u64;
    let out_of_range = || Error::OutOfRange {
        offset: start,
        len,
        size,
    };
    let end = start.checked_add(len).ok_or_else(out_of_range)?;
    if end > size {
        return Err(out_of_range());
    }
    Ok(start as usize..end as usize)
}

/// Read-only window of `E` elements into guest memory.
#[derive(Debug, Clone, Copy)]
pub struct View<'m, E> {
    bytes: &'m [u8],
    _element: PhantomData<E>,
}

impl<'m, E: Element> View<'m, E> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / E::KIND.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Element at `index`, if in bounds.
    pub fn get(&self, index: usize) -> Option<E> {
        let size = E::KIND.size();
        let start = index.checked_mul(size)?;
        self.bytes.get(start..start.checked_add(size)?).map(E::decode)
    }

    pub fn iter(&self) -> impl Iterator<Item = E> + 'm {
        self.bytes.chunks_exact(E::KIND.size()).map(E::decode)
    }

    /// Copy the elements out of guest memory.
    pub fn to_vec(&self) -> Vec<E> {
        self.iter().collect()
    }

    /// Raw bytes backing the view.
    pub fn as_bytes(&self) -> &'m [u8] {
        self.bytes
    }
}

/// Writable window of `E` elements into guest memory.
#[derive(Debug)]
pub struct ViewMut<'m, E> {
    bytes: &'m mut [u8],
    _element: PhantomData<E>,
}

impl<E: Element> ViewMut<'_, E> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / E::KIND.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Store `value` at `index`. Returns `false` when out of bounds.
    pub fn set(&mut self, index: usize, value: E) -> bool {
        let size = E::KIND.size();
        let Some(start) = index.checked_mul(size) else {
            return false;
        };
        let Some(end) = start.checked_add(size) else {
            return false;
        };
        match self.bytes.get_mut(start..end) {
            Some(slot) => {
                value.encode(slot);
                true
            }
            None => false,
        }
    }

    /// Raw bytes backing the view.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

/// Build a read-only view of `count` elements at `offset`.
pub fn view<E: Element>(memory: &[u8], offset: u32, count: u32) -> Result<View<'_, E>> {
    let range = byte_range(memory.len(), offset, count, E::KIND)?;
    Ok(View {
        bytes: &memory[range],
        _element: PhantomData,
    })
}

/// Build a writable view of `count` elements at `offset`.
pub fn view_mut<E: Element>(memory: &mut [u8], offset: u32, count: u32) -> Result<ViewMut<'_, E>> {
    let range = byte_range(memory.len(), offset, count, E::KIND)?;
    Ok(ViewMut {
        bytes: &mut memory[range],
        _element: PhantomData,
    })
}

/// Borrow `len` raw bytes at `ptr`.
pub fn read_bytes(memory: &[u8], ptr: u32, len: u32) -> Result<&[u8]> {
    view::<u8>(memory, ptr, len).map(|view| view.as_bytes())
}

/// Copy `data` into guest memory at `ptr`.
pub fn write_bytes(memory: &mut [u8], ptr: u32, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| Error::OutOfRange {
        offset: u64::from(ptr),
        len: data.len() as u64,
        size: memory.len() as u64,
    })?;
    let mut view = view_mut::<u8>(memory, ptr, len)?;
    view.as_bytes_mut().copy_from_slice(data);
    Ok(())
}

/// Host-owned linear memory with page-granular growth.
///
/// Growing replaces the backing buffer, the same way a wasm engine may
/// move memory on `memory.grow`. Useful for embedding the bridge without a
/// wasm engine and for exercising the marshaling code in tests.
#[derive(Debug, Clone, Default)]
pub struct LinearMemory {
    bytes: Vec<u8>,
}

impl LinearMemory {
    /// Create a memory of `pages` zeroed wasm pages.
    pub fn with_pages(pages: usize) -> Self {
        Self {
            bytes: vec![0; pages * WASM_PAGE_BYTES],
        }
    }

    /// Current size in pages.
    pub fn pages(&self) -> usize {
        self.bytes.len() / WASM_PAGE_BYTES
    }

    /// Grow by `delta` pages, moving the contents to a fresh buffer.
    /// Returns the previous size in pages.
    pub fn grow(&mut self, delta: usize) -> usize {
        let previous = self.pages();
        let mut next = vec![0; (previous + delta) * WASM_PAGE_BYTES];
        next[..self.bytes.len()].copy_from_slice(&self.bytes);
        self.bytes = next;
        previous
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
