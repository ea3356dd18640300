use crate::console::GuestConsole;
use crate::gl_imports;
use crate::guest::{caller_memory, CallerGuest};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::debug;
use wasmtime::{Caller, ExternType, Linker, Module, Val};
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::WasiCtxBuilder;
use zg_core::{marshal, stage_bytes, BridgeConfig, EventSink, GuestExport};
use zg_gl::{GlBridge, GlOp, GpuDriver};
use zg_net::{SocketManager, SocketTransport};

/// Everything the host imports of one guest instance operate on.
///
/// Owned by the wasmtime store; there is no global bridge state.
pub struct BridgeState<D: GpuDriver> {
    /// GL handle tables and the driver behind them.
    pub gl: GlBridge<D>,
    /// Socket sessions opened by the guest.
    pub sockets: SocketManager,
    /// Pending `wasm_log_write` output.
    pub console: GuestConsole,
    /// WASI context, linked only when the guest asks for WASI.
    pub wasi: WasiP1Ctx,
    memory_export: Arc<str>,
    quit_requested: bool,
}

impl<D: GpuDriver> BridgeState<D> {
    /// Create the state for a new guest instance.
    pub fn new(
        driver: D,
        transport: Box<dyn SocketTransport>,
        events: EventSink,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            gl: GlBridge::new(driver),
            sockets: SocketManager::new(transport, events),
            console: GuestConsole::new(&config.log),
            wasi: WasiCtxBuilder::new().inherit_stdio().build_p1(),
            memory_export: Arc::from(config.guest.memory_export.as_str()),
            quit_requested: false,
        }
    }

    /// Name of the guest's memory export.
    pub fn memory_export(&self) -> Arc<str> {
        Arc::clone(&self.memory_export)
    }

    /// Whether the guest called `wasm_quit`.
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Close every session, delete every GPU object still referenced by a
    /// handle and flush pending guest output.
    pub fn teardown(&mut self) {
        self.sockets.close_all();
        self.gl.release_all();
        self.console.flush();
        debug!("bridge state torn down");
    }
}

/// Run `f` against the bridge state, converting a bridge error into a trap
/// attributed to `import`.
pub(crate) fn with_state<D, R>(
    caller: &mut Caller<'_, BridgeState<D>>,
    import: &'static str,
    f: impl FnOnce(&mut BridgeState<D>) -> zg_core::Result<R>,
) -> anyhow::Result<R>
where
    D: GpuDriver + 'static,
{
    f(caller.data_mut()).map_err(|err| Error::import(import, err).into())
}

/// Like [`with_state`], with the guest memory fetched for this call only.
pub(crate) fn with_memory<D, R>(
    caller: &mut Caller<'_, BridgeState<D>>,
    import: &'static str,
    f: impl FnOnce(&mut [u8], &mut BridgeState<D>) -> zg_core::Result<R>,
) -> anyhow::Result<R>
where
    D: GpuDriver + 'static,
{
    let result = caller_memory(caller).and_then(|memory| {
        let (data, state) = memory.data_and_store_mut(&mut *caller);
        f(data, state)
    });
    result.map_err(|err| Error::import(import, err).into())
}

/// Host functions exposed to zg guests.
pub struct HostFunctions;

impl HostFunctions {
    /// Register the platform, socket and GL imports under `module`.
    pub fn register<D>(linker: &mut Linker<BridgeState<D>>, module: &str) -> Result<()>
    where
        D: GpuDriver + 'static,
    {
        Self::register_platform(linker, module)?;
        Self::register_sockets(linker, module)?;

        let mut defined = 0;
        for &op in GlOp::ALL {
            if gl_imports::define(linker, module, op)? {
                defined += 1;
            }
        }
        debug!(module, defined, "GL imports registered");
        Ok(())
    }

    /// Define every unported GL import `wasm` links against as a function
    /// that traps with `NotImplemented`.
    ///
    /// The trap functions take the signature the guest declared, so guests
    /// that never call them still instantiate.
    pub fn register_unported<D>(
        linker: &mut Linker<BridgeState<D>>,
        wasm: &Module,
        module: &str,
    ) -> Result<()>
    where
        D: GpuDriver + 'static,
    {
        for import in wasm.imports() {
            if import.module() != module {
                continue;
            }
            let Some(op) = GlOp::from_symbol(import.name()) else {
                continue;
            };
            if op.is_ported() {
                continue;
            }
            let ExternType::Func(ty) = import.ty() else {
                continue;
            };
            linker
                .func_new(
                    module,
                    op.symbol(),
                    ty,
                    move |_caller: Caller<'_, BridgeState<D>>, _params: &[Val], _results: &mut [Val]| {
                        Err(Error::import(op.symbol(), op.not_implemented()).into())
                    },
                )
                .map_err(|e| Error::Wasm(e.to_string()))?;
            debug!(import = op.symbol(), "unported GL import linked as trap");
        }
        Ok(())
    }

    fn register_platform<D>(linker: &mut Linker<BridgeState<D>>, module: &str) -> Result<()>
    where
        D: GpuDriver + 'static,
    {
        linker
            .func_wrap(
                module,
                "wasm_quit",
                |mut caller: Caller<'_, BridgeState<D>>| -> anyhow::Result<()> {
                    caller.data_mut().quit_requested = true;
                    anyhow::bail!("application exit")
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        linker
            .func_wrap(
                module,
                "wasm_panic",
                |mut caller: Caller<'_, BridgeState<D>>, ptr: u32, len: u32| -> anyhow::Result<()> {
                    let message = with_memory(&mut caller, "wasm_panic", |memory, _| {
                        marshal::read_utf8(memory, ptr, len)
                    })?;
                    Err(Error::GuestPanic(message).into())
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        linker
            .func_wrap(
                module,
                "wasm_log_write",
                |mut caller: Caller<'_, BridgeState<D>>, ptr: u32, len: u32| -> anyhow::Result<()> {
                    with_memory(&mut caller, "wasm_log_write", |memory, state| {
                        let text = marshal::read_utf8(memory, ptr, len)?;
                        state.console.write(&text);
                        Ok(())
                    })
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        linker
            .func_wrap(
                module,
                "wasm_log_flush",
                |mut caller: Caller<'_, BridgeState<D>>| {
                    caller.data_mut().console.flush();
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        linker
            .func_wrap(module, "now_f64", || -> f64 {
                chrono::Utc::now().timestamp_millis() as f64
            })
            .map_err(|e| Error::Wasm(e.to_string()))?;

        for name in ["meta_getScreenW", "wasm_getScreenW"] {
            linker
                .func_wrap(module, name, |caller: Caller<'_, BridgeState<D>>| -> u32 {
                    caller.data().gl.screen_size().0
                })
                .map_err(|e| Error::Wasm(e.to_string()))?;
        }
        for name in ["meta_getScreenH", "wasm_getScreenH"] {
            linker
                .func_wrap(module, name, |caller: Caller<'_, BridgeState<D>>| -> u32 {
                    caller.data().gl.screen_size().1
                })
                .map_err(|e| Error::Wasm(e.to_string()))?;
        }

        Ok(())
    }

    fn register_sockets<D>(linker: &mut Linker<BridgeState<D>>, module: &str) -> Result<()>
    where
        D: GpuDriver + 'static,
    {
        linker
            .func_wrap(
                module,
                "socket_connect",
                |mut caller: Caller<'_, BridgeState<D>>,
                 url_ptr: u32,
                 url_len: u32,
                 proto_ptrs: u32,
                 proto_lens: u32,
                 proto_count: u32|
                 -> anyhow::Result<u32> {
                    with_memory(&mut caller, "socket_connect", |memory, state| {
                        let endpoint = marshal::read_utf8(memory, url_ptr, url_len)?;
                        let subprotocols =
                            marshal::read_utf8_list(memory, proto_ptrs, proto_lens, proto_count)?;
                        let session = state.sockets.connect(&endpoint, &subprotocols)?;
                        Ok(session.get())
                    })
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        linker
            .func_wrap(
                module,
                "socket_send",
                |mut caller: Caller<'_, BridgeState<D>>,
                 session: u32,
                 binary: u32,
                 ptr: u32,
                 len: u32|
                 -> anyhow::Result<()> {
                    with_memory(&mut caller, "socket_send", |memory, state| {
                        let data = zg_core::memory::read_bytes(memory, ptr, len)?;
                        state.sockets.send(session, binary != 0, data)
                    })
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        linker
            .func_wrap(
                module,
                "socket_destroy",
                |mut caller: Caller<'_, BridgeState<D>>, session: u32| {
                    caller.data_mut().sockets.destroy(session);
                },
            )
            .map_err(|e| Error::Wasm(e.to_string()))?;

        Ok(())
    }

    /// `getStringJs(name)`: query a string parameter and hand it to the guest
    /// through `getString_alloc`. The guest learns the address only through
    /// its own allocator.
    pub(crate) fn get_string<D>(
        caller: &mut Caller<'_, BridgeState<D>>,
        name: u32,
    ) -> anyhow::Result<()>
    where
        D: GpuDriver + 'static,
    {
        let value = caller.data_mut().gl.query_string(name);
        let mut guest = CallerGuest::new(caller);
        stage_bytes(&mut guest, GuestExport::StringAlloc, value.as_bytes())
            .map_err(|err| Error::import(GlOp::GetStringJs.symbol(), err))?;
        Ok(())
    }
}
