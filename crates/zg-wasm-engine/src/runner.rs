use crate::guest::StoreGuest;
use crate::host::{BridgeState, HostFunctions};
use crate::{Error, Result};
use tracing::{debug, info};
use wasmtime::{Engine, Instance, Linker, Module, Store};
use zg_core::{event, BridgeConfig, EventQueue, GuestInstance};
use zg_gl::GpuDriver;
use zg_net::{EventRouter, InputSource, RouterStats, SocketTransport};

/// Whether the guest is still alive after a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// The guest called `wasm_quit`, or the instance was torn down.
    Exited,
}

/// Compiles and instantiates guest modules.
pub struct BridgeRuntime {
    engine: Engine,
    config: BridgeConfig,
}

impl BridgeRuntime {
    /// Create a new `BridgeRuntime` for the given configuration.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        Ok(Self {
            engine: Engine::default(),
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Compile `wasm` (binary or text format), link the host imports and
    /// instantiate it against `driver` and `transport`.
    pub fn load<D>(
        &self,
        wasm: impl AsRef<[u8]>,
        driver: D,
        transport: Box<dyn SocketTransport>,
    ) -> Result<BridgeInstance<D>>
    where
        D: GpuDriver + 'static,
    {
        let module =
            Module::new(&self.engine, wasm.as_ref()).map_err(|e| Error::Wasm(e.to_string()))?;

        let (events, queue) = event::channel();
        let input = InputSource::new(events.clone());
        let state = BridgeState::new(driver, transport, events, &self.config);

        let mut store = Store::new(&self.engine, state);
        let mut linker = Linker::new(&self.engine);

        let import_module = self.config.guest.import_module.as_str();
        HostFunctions::register(&mut linker, import_module)?;
        HostFunctions::register_unported(&mut linker, &module, import_module)?;
        if self.config.guest.wasi {
            wasmtime_wasi::preview1::add_to_linker_sync(&mut linker, |state: &mut BridgeState<D>| {
                &mut state.wasi
            })
            .map_err(|e| Error::Wasm(e.to_string()))?;
        }

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| Error::Wasm(format!("{:#}", e)))?;
        info!(
            module = import_module,
            imports = module.imports().len(),
            wasi = self.config.guest.wasi,
            "guest instantiated"
        );

        Ok(BridgeInstance {
            store,
            instance: Some(instance),
            queue,
            input,
            router: EventRouter::new(),
        })
    }
}

/// A running guest together with its bridge state and host event queue.
///
/// Guest calls and event delivery never overlap: host events queue up
/// while the guest runs and reach it through [`pump_events`].
///
/// [`pump_events`]: BridgeInstance::pump_events
pub struct BridgeInstance<D: GpuDriver + 'static> {
    store: Store<BridgeState<D>>,
    instance: Option<Instance>,
    queue: EventQueue,
    input: InputSource,
    router: EventRouter,
}

impl<D: GpuDriver + 'static> BridgeInstance<D> {
    /// Call a `() -> ()` export such as an init or frame function.
    ///
    /// A guest that calls `wasm_quit` ends in [`RunState::Exited`] and is torn
    /// down. Any other trap is returned as an error; bridge errors raised by
    /// an import come back as [`Error::Import`].
    pub fn call(&mut self, export: &str) -> Result<RunState> {
        let Some(instance) = self.instance else {
            return Ok(RunState::Exited);
        };
        let func = instance
            .get_typed_func::<(), ()>(&mut self.store, export)
            .map_err(|e| Error::Wasm(format!("export {}: {}", export, e)))?;

        match func.call(&mut self.store, ()) {
            Ok(()) => Ok(RunState::Running),
            Err(err) => self.trapped(err),
        }
    }

    /// Whether the guest exports a function called `name`.
    pub fn has_export(&mut self, name: &str) -> bool {
        self.instance
            .is_some_and(|instance| instance.get_func(&mut self.store, name).is_some())
    }

    /// Deliver every queued host event, in arrival order.
    ///
    /// Must only be called between guest calls. After teardown queued events
    /// are dropped.
    pub fn pump_events(&mut self) -> RunState {
        while let Some(event) = self.queue.try_next() {
            let Some(instance) = self.instance else {
                let sessions = &mut self.store.data_mut().sockets;
                self.router
                    .route(sessions, None::<&mut dyn GuestInstance>, event);
                continue;
            };

            let Some(event) = self.router.admit(&mut self.store.data_mut().sockets, event) else {
                continue;
            };
            let mut guest = StoreGuest::new(&mut self.store, instance);
            self.router.deliver(&mut guest, event);

            if self.store.data().quit_requested() {
                info!("guest requested exit while handling an event");
                self.teardown();
                return RunState::Exited;
            }
        }
        self.state()
    }

    /// The guest's linear memory as of now. Any later guest call may grow
    /// it, so the slice cannot outlive the borrow of the instance.
    pub fn memory(&mut self) -> Result<&mut [u8]> {
        let instance = self
            .instance
            .ok_or_else(|| Error::InvalidInput("guest has been torn down".to_string()))?;
        let name = self.store.data().memory_export();
        let memory = instance
            .get_memory(&mut self.store, &name)
            .ok_or_else(|| zg_core::Error::MissingExport(name.to_string()))?;
        Ok(memory.data_mut(&mut self.store))
    }

    /// Input source feeding this instance's event queue.
    pub fn input(&self) -> InputSource {
        self.input.clone()
    }

    pub fn bridge(&self) -> &BridgeState<D> {
        self.store.data()
    }

    pub fn bridge_mut(&mut self) -> &mut BridgeState<D> {
        self.store.data_mut()
    }

    pub fn router_stats(&self) -> RouterStats {
        self.router.stats()
    }

    pub fn state(&self) -> RunState {
        if self.instance.is_some() {
            RunState::Running
        } else {
            RunState::Exited
        }
    }

    /// Close every socket session, release every GPU object and stop
    /// accepting host events. The guest is not called again.
    pub fn teardown(&mut self) {
        if self.instance.take().is_none() {
            return;
        }
        self.queue.close();
        self.store.data_mut().teardown();
        info!(stats = ?self.router.stats(), "guest torn down");
    }

    fn trapped(&mut self, err: anyhow::Error) -> Result<RunState> {
        if self.store.data().quit_requested() {
            info!("guest requested exit");
            self.teardown();
            return Ok(RunState::Exited);
        }
        let err = match err.downcast::<Error>() {
            Ok(err) => err,
            Err(err) => Error::Wasm(format!("{:#}", err)),
        };
        debug!("guest call trapped: {}", err);
        Err(err)
    }
}

impl<D: GpuDriver + 'static> Drop for BridgeInstance<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
