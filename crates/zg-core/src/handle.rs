use crate::{Error, Result};
use std::fmt;

/// Opaque id standing in for a host object inside one resource table.
///
/// `Handle::NULL` (raw value `0`) never refers to an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    /// The reserved "no object" handle.
    pub const NULL: Handle = Handle(0);

    /// Wrap a raw value received from the guest.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value as seen by the guest.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the reserved null handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Handle> for u32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of host object stored in a table. Handles are only meaningful
/// within the table of their own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Shader,
    Program,
    Buffer,
    VertexArray,
    Texture,
    Framebuffer,
    UniformLocation,
    SocketSession,
}

impl ResourceKind {
    /// All kinds, in declaration order.
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Shader,
        ResourceKind::Program,
        ResourceKind::Buffer,
        ResourceKind::VertexArray,
        ResourceKind::Texture,
        ResourceKind::Framebuffer,
        ResourceKind::UniformLocation,
        ResourceKind::SocketSession,
    ];

    /// Human-readable name used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Shader => "shader",
            ResourceKind::Program => "program",
            ResourceKind::Buffer => "buffer",
            ResourceKind::VertexArray => "vertex array",
            ResourceKind::Texture => "texture",
            ResourceKind::Framebuffer => "framebuffer",
            ResourceKind::UniformLocation => "uniform location",
            ResourceKind::SocketSession => "socket session",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
enum Slot<T> {
    /// Slot 0, permanently empty.
    Reserved,
    Occupied(T),
    /// Deleted; never handed out again.
    Tombstone,
}

/// Append-only table owning host objects of one kind.
///
/// Slot 0 is seeded at construction so the first allocation returns 1.
/// Deleted slots become tombstones and are never recycled.
#[derive(Debug)]
pub struct HandleTable<T> {
    kind: ResourceKind,
    slots: Vec<Slot<T>>,
}

impl<T> HandleTable<T> {
    /// Create an empty table for the given kind.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            slots: vec![Slot::Reserved],
        }
    }

    /// Kind of objects held by this table.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The handle the next allocation will return.
    pub fn next_handle(&self) -> Handle {
        Handle(self.slots.len() as u32)
    }

    /// Number of slots ever handed out (live or tombstoned).
    pub fn allocated(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of live objects.
    pub fn live(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count()
    }

    /// Store an object and return its new handle.
    pub fn allocate(&mut self, object: T) -> Handle {
        let handle = self.next_handle();
        self.slots.push(Slot::Occupied(object));
        handle
    }

    /// Create the object with knowledge of its future handle.
    ///
    /// Nothing is appended when `create` fails, so no id is consumed.
    pub fn allocate_with<E, F>(&mut self, create: F) -> std::result::Result<Handle, E>
    where
        F: FnOnce(Handle) -> std::result::Result<T, E>,
    {
        let handle = self.next_handle();
        let object = create(handle)?;
        self.slots.push(Slot::Occupied(object));
        Ok(handle)
    }

    /// Allocate `count` objects; the returned handles are contiguous and ascending.
    pub fn allocate_many<F>(&mut self, count: usize, mut create: F) -> Vec<Handle>
    where
        F: FnMut() -> T,
    {
        (0..count).map(|_| self.allocate(create())).collect()
    }

    /// Resolve a handle to its object.
    pub fn lookup(&self, handle: impl Into<Handle>) -> Result<&T> {
        let handle = handle.into();
        match self.slots.get(handle.0 as usize) {
            Some(Slot::Occupied(object)) => Ok(object),
            _ => Err(self.invalid(handle)),
        }
    }

    /// Resolve a handle to its object mutably.
    pub fn lookup_mut(&mut self, handle: impl Into<Handle>) -> Result<&mut T> {
        let handle = handle.into();
        let kind = self.kind;
        match self.slots.get_mut(handle.0 as usize) {
            Some(Slot::Occupied(object)) => Ok(object),
            _ => Err(Error::InvalidHandle {
                kind,
                handle: handle.0,
            }),
        }
    }

    /// Like [`lookup`](Self::lookup), but maps handle 0 to `None` for
    /// driver calls that accept a null object (unbinding).
    pub fn lookup_nullable(&self, handle: impl Into<Handle>) -> Result<Option<&T>> {
        let handle = handle.into();
        if handle.is_null() {
            return Ok(None);
        }
        self.lookup(handle).map(Some)
    }

    /// Whether the handle currently refers to a live object.
    pub fn contains(&self, handle: impl Into<Handle>) -> bool {
        self.lookup(handle).is_ok()
    }

    /// Remove the object behind `handle`, leaving a tombstone.
    ///
    /// Returns the released object, or `None` if the slot was already
    /// tombstoned. Fails for 0 and for handles never allocated.
    pub fn delete(&mut self, handle: impl Into<Handle>) -> Result<Option<T>> {
        let handle = handle.into();
        let kind = self.kind;
        let invalid = Error::InvalidHandle {
            kind,
            handle: handle.0,
        };
        let Some(slot) = self.slots.get_mut(handle.0 as usize) else {
            return Err(invalid);
        };
        match std::mem::replace(slot, Slot::Tombstone) {
            Slot::Occupied(object) => Ok(Some(object)),
            Slot::Tombstone => Ok(None),
            Slot::Reserved => {
                *slot = Slot::Reserved;
                Err(invalid)
            }
        }
    }

    /// Delete and hand the released object to `release` for host teardown.
    pub fn delete_with<F>(&mut self, handle: impl Into<Handle>, release: F) -> Result<()>
    where
        F: FnOnce(T),
    {
        if let Some(object) = self.delete(handle)? {
            release(object);
        }
        Ok(())
    }

    /// Delete every handle in order. A failing element does not stop the
    /// rest; each failure is returned.
    pub fn delete_many<F>(&mut self, handles: &[u32], mut release: F) -> Vec<Error>
    where
        F: FnMut(T),
    {
        let mut failures = Vec::new();
        for &raw in handles {
            match self.delete(raw) {
                Ok(Some(object)) => release(object),
                Ok(None) => {}
                Err(err) => failures.push(err),
            }
        }
        failures
    }

    /// Iterate live objects with their handles, in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(object) => Some((Handle(index as u32), object)),
                _ => None,
            })
    }

    /// Tombstone every live slot and return the released objects.
    pub fn release_all(&mut self) -> Vec<(Handle, T)> {
        let mut released = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match std::mem::replace(slot, Slot::Tombstone) {
                Slot::Occupied(object) => released.push((Handle(index as u32), object)),
                other => *slot = other,
            }
        }
        released
    }

    fn invalid(&self, handle: Handle) -> Error {
        Error::InvalidHandle {
            kind: self.kind,
            handle: handle.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_allocation_is_one() {
        for kind in ResourceKind::ALL {
            let mut table = HandleTable::new(kind);
            assert_eq!(table.allocate(()).get(), 1);
        }
    }

    #[test]
    fn null_handle_never_resolves() {
        let mut table = HandleTable::new(ResourceKind::Texture);
        table.allocate("tex");

        assert!(matches!(
            table.lookup(0u32),
            Err(Error::InvalidHandle { handle: 0, .. })
        ));
        assert!(table.delete(0u32).is_err());
        assert_eq!(table.lookup_nullable(0u32).unwrap(), None);
    }

    #[test]
    fn delete_leaves_tombstone() {
        let mut table = HandleTable::new(ResourceKind::Shader);
        let a = table.allocate(10);
        let b = table.allocate(20);

        assert_eq!(table.delete(a).unwrap(), Some(10));
        assert!(table.lookup(a).is_err());
        assert_eq!(table.delete(a).unwrap(), None);
        assert_eq!(*table.lookup(b).unwrap(), 20);

        let c = table.allocate(30);
        assert_eq!(c.get(), 3);
        assert!(table.lookup(a).is_err());
    }

    #[test]
    fn delete_of_unallocated_handle_fails() {
        let mut table: HandleTable<()> = HandleTable::new(ResourceKind::Program);
        let err = table.delete(5u32).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidHandle {
                kind: ResourceKind::Program,
                handle: 5
            }
        ));
    }

    #[test]
    fn allocate_with_does_not_consume_on_failure() {
        let mut table: HandleTable<u32> = HandleTable::new(ResourceKind::SocketSession);
        let failed: std::result::Result<Handle, &str> = table.allocate_with(|_| Err("refused"));
        assert!(failed.is_err());

        let handle = table
            .allocate_with::<(), _>(|handle| Ok(handle.get() * 100))
            .unwrap();
        assert_eq!(handle.get(), 1);
        assert_eq!(*table.lookup(handle).unwrap(), 100);
    }

    #[test]
    fn delete_many_is_best_effort() {
        let mut table = HandleTable::new(ResourceKind::VertexArray);
        table.allocate_many(3, || ());

        let mut released = 0;
        let failures = table.delete_many(&[1, 0, 3, 9], |_| released += 1);

        assert_eq!(released, 2);
        assert_eq!(failures.len(), 2);
        assert!(table.lookup(2u32).is_ok());
        assert!(table.lookup(3u32).is_err());
    }

    #[test]
    fn release_all_tombstones_everything() {
        let mut table = HandleTable::new(ResourceKind::Framebuffer);
        table.allocate('a');
        let b = table.allocate('b');
        table.delete(b).unwrap();
        table.allocate('c');

        let released = table.release_all();
        assert_eq!(
            released,
            vec![(Handle::from_raw(1), 'a'), (Handle::from_raw(3), 'c')]
        );
        assert_eq!(table.live(), 0);
        assert_eq!(table.allocated(), 3);
        assert_eq!(table.next_handle().get(), 4);
    }
}
