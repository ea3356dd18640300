//! Conversions between the guest's pointer/length encoding and host types.

use crate::memory::{read_bytes, view, view_mut, Element};
use crate::{Error, Result};

/// Decode exactly `len` bytes at `ptr` as UTF-8.
///
/// Embedded NUL bytes are kept. Invalid sequences decode to U+FFFD.
pub fn read_utf8(memory: &[u8], ptr: u32, len: u32) -> Result<String> {
    let bytes = read_bytes(memory, ptr, len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Copy `text` into a guest buffer of `capacity` bytes at `ptr`.
///
/// At most `capacity - 1` bytes are copied, cut back to a character
/// boundary, and a NUL is written right after them. When `len_out_ptr` is
/// non-zero the copied length (without the NUL) is stored there as a `u32`.
/// Returns the copied length. Both ranges are checked before anything is
/// written.
pub fn write_utf8(
    memory: &mut [u8],
    ptr: u32,
    capacity: u32,
    len_out_ptr: u32,
    text: &str,
) -> Result<u32> {
    if len_out_ptr != 0 {
        view_mut::<u32>(memory, len_out_ptr, 1)?;
    }
    let copied = {
        let mut dest = view_mut::<u8>(memory, ptr, capacity)?;
        let dest = dest.as_bytes_mut();
        if dest.is_empty() {
            0
        } else {
            let mut copied = text.len().min(dest.len() - 1);
            while !text.is_char_boundary(copied) {
                copied -= 1;
            }
            dest[..copied].copy_from_slice(&text.as_bytes()[..copied]);
            dest[copied] = 0;
            copied
        }
    };

    let copied = copied as u32;
    if len_out_ptr != 0 {
        write_scalar(memory, len_out_ptr, copied)?;
    }
    Ok(copied)
}

/// One `(ptr, len)` entry of a guest string batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub ptr: u32,
    pub len: u32,
}

/// Zip two parallel `u32` arrays of pointers and lengths.
pub fn read_ptr_len_array(
    memory: &[u8],
    ptrs_ptr: u32,
    lens_ptr: u32,
    count: u32,
) -> Result<Vec<Fragment>> {
    let ptrs = view::<u32>(memory, ptrs_ptr, count)?;
    let lens = view::<u32>(memory, lens_ptr, count)?;
    Ok(ptrs
        .iter()
        .zip(lens.iter())
        .map(|(ptr, len)| Fragment { ptr, len })
        .collect())
}

/// Read a batch of strings and join them in array order.
///
/// Drivers take a single source string, so shader sources passed as several
/// fragments are concatenated before the call.
pub fn read_concatenated_utf8(
    memory: &[u8],
    ptrs_ptr: u32,
    lens_ptr: u32,
    count: u32,
) -> Result<String> {
    let mut text = String::new();
    for fragment in read_ptr_len_array(memory, ptrs_ptr, lens_ptr, count)? {
        text.push_str(&read_utf8(memory, fragment.ptr, fragment.len)?);
    }
    Ok(text)
}

/// Read all strings of a batch individually.
pub fn read_utf8_list(
    memory: &[u8],
    ptrs_ptr: u32,
    lens_ptr: u32,
    count: u32,
) -> Result<Vec<String>> {
    read_ptr_len_array(memory, ptrs_ptr, lens_ptr, count)?
        .into_iter()
        .map(|fragment| read_utf8(memory, fragment.ptr, fragment.len))
        .collect()
}

/// Read `count` groups of `stride` elements (e.g. 16 floats per 4x4 matrix).
///
/// The total element count is validated before the view is built.
pub fn read_array<E: Element>(memory: &[u8], ptr: u32, count: u32, stride: u32) -> Result<Vec<E>> {
    let total = count.checked_mul(stride).ok_or(Error::OutOfRange {
        offset: u64::from(ptr),
        len: (u64::from(count) * u64::from(stride)).saturating_mul(E::KIND.size() as u64),
        size: memory.len() as u64,
    })?;
    Ok(view::<E>(memory, ptr, total)?.to_vec())
}

/// Read one element at `ptr`.
pub fn read_scalar<E: Element>(memory: &[u8], ptr: u32) -> Result<E> {
    let view = view::<E>(memory, ptr, 1)?;
    view.get(0).ok_or(Error::OutOfRange {
        offset: u64::from(ptr),
        len: E::KIND.size() as u64,
        size: memory.len() as u64,
    })
}

/// Store one element at `ptr`, the layout used for guest out-parameters.
pub fn write_scalar<E: Element>(memory: &mut [u8], ptr: u32, value: E) -> Result<()> {
    let mut view = view_mut::<E>(memory, ptr, 1)?;
    view.set(0, value);
    Ok(())
}
