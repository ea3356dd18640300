//! [`GuestInstance`] adapters over a wasmtime instance.
//!
//! Both adapters look the memory export up again on every access, so a
//! guest allocator that grows memory never leaves a stale slice behind.

use crate::host::BridgeState;
use wasmtime::{AsContextMut, Caller, Extern, Func, Instance, Memory, Store, Val};
use zg_core::{Error, GuestExport, GuestInstance, Result};
use zg_gl::GpuDriver;

/// The guest as seen from inside a host import.
pub struct CallerGuest<'a, 'c, D: GpuDriver + 'static> {
    caller: &'a mut Caller<'c, BridgeState<D>>,
}

impl<'a, 'c, D: GpuDriver + 'static> CallerGuest<'a, 'c, D> {
    pub fn new(caller: &'a mut Caller<'c, BridgeState<D>>) -> Self {
        Self { caller }
    }
}

impl<D: GpuDriver + 'static> GuestInstance for CallerGuest<'_, '_, D> {
    fn memory(&mut self) -> Result<&mut [u8]> {
        let memory = caller_memory(self.caller)?;
        Ok(memory.data_mut(&mut *self.caller))
    }

    fn invoke(&mut self, export: GuestExport, args: &[i32]) -> Result<Option<i32>> {
        let func = self
            .caller
            .get_export(export.symbol())
            .and_then(Extern::into_func)
            .ok_or_else(|| Error::MissingExport(export.symbol().to_string()))?;
        call_export(&mut *self.caller, func, export, args)
    }
}

/// The guest as seen by the embedder between guest calls.
pub struct StoreGuest<'a, D: GpuDriver + 'static> {
    store: &'a mut Store<BridgeState<D>>,
    instance: Instance,
}

impl<'a, D: GpuDriver + 'static> StoreGuest<'a, D> {
    pub fn new(store: &'a mut Store<BridgeState<D>>, instance: Instance) -> Self {
        Self { store, instance }
    }
}

impl<D: GpuDriver + 'static> GuestInstance for StoreGuest<'_, D> {
    fn memory(&mut self) -> Result<&mut [u8]> {
        let name = self.store.data().memory_export();
        let memory = self
            .instance
            .get_memory(&mut *self.store, &name)
            .ok_or_else(|| Error::MissingExport(name.to_string()))?;
        Ok(memory.data_mut(&mut *self.store))
    }

    fn invoke(&mut self, export: GuestExport, args: &[i32]) -> Result<Option<i32>> {
        let func = self
            .instance
            .get_func(&mut *self.store, export.symbol())
            .ok_or_else(|| Error::MissingExport(export.symbol().to_string()))?;
        call_export(&mut *self.store, func, export, args)
    }
}

/// Resolve the guest's memory export from inside a host import.
pub(crate) fn caller_memory<D: GpuDriver + 'static>(
    caller: &mut Caller<'_, BridgeState<D>>,
) -> Result<Memory> {
    let name = caller.data().memory_export();
    caller
        .get_export(&name)
        .and_then(Extern::into_memory)
        .ok_or_else(|| Error::MissingExport(name.to_string()))
}

fn call_export(
    mut store: impl AsContextMut,
    func: Func,
    export: GuestExport,
    args: &[i32],
) -> Result<Option<i32>> {
    let params: Vec<Val> = args.iter().map(|&arg| Val::I32(arg)).collect();
    let mut results = vec![Val::I32(0); func.ty(&store).results().len()];
    func.call(&mut store, &params, &mut results)
        .map_err(|err| Error::Guest(format!("{} trapped: {:#}", export.symbol(), err)))?;
    Ok(results.first().and_then(Val::i32))
}
