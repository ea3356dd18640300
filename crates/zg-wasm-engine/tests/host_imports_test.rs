use zg_core::{BridgeConfig, Error as BridgeError, EventSink, Handle, ResourceKind};
use zg_gl::HeadlessDriver;
use zg_net::{MessageStream, OutboundMessage, SocketTransport};
use zg_wasm_engine::{BridgeInstance, BridgeRuntime, Error, RunState};

/// Transport that accepts every endpoint and never reports anything.
struct SilentTransport;

struct SilentStream;

impl MessageStream for SilentStream {
    fn send(&mut self, _message: OutboundMessage) -> zg_core::Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

impl SocketTransport for SilentTransport {
    fn open(
        &mut self,
        _session: Handle,
        _endpoint: &str,
        _subprotocols: &[String],
        _events: EventSink,
    ) -> zg_core::Result<Box<dyn MessageStream>> {
        Ok(Box::new(SilentStream))
    }
}

fn load(wat: &str) -> BridgeInstance<HeadlessDriver> {
    load_with(wat, BridgeConfig::default())
}

fn load_with(wat: &str, config: BridgeConfig) -> BridgeInstance<HeadlessDriver> {
    BridgeRuntime::new(config)
        .unwrap()
        .load(wat, HeadlessDriver::new(320, 200), Box::new(SilentTransport))
        .unwrap()
}

fn read_u32(memory: &[u8], ptr: usize) -> u32 {
    u32::from_le_bytes(memory[ptr..ptr + 4].try_into().unwrap())
}

const GL_GUEST: &str = r#"
(module
  (import "env" "genBuffers" (func $genBuffers (param i32 i32)))
  (import "env" "bindBuffer" (func $bindBuffer (param i32 i32)))
  (import "env" "bufferData" (func $bufferData (param i32 i32 i32 i32)))
  (import "env" "createShader" (func $createShader (param i32) (result i32)))
  (import "env" "shaderSource" (func $shaderSource (param i32 i32 i32 i32)))
  (import "env" "compileShader" (func $compileShader (param i32)))
  (import "env" "getShaderiv" (func $getShaderiv (param i32 i32 i32)))
  (import "env" "drawArrays" (func $drawArrays (param i32 i32 i32)))
  (import "env" "deleteBuffers" (func $deleteBuffers (param i32 i32)))
  (import "env" "readPixels" (func $readPixels (param i32 i32 i32 i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 256) "void main(){}")
  (data (i32.const 512) "\00\01\00\00\05\01\00\00")
  (data (i32.const 520) "\05\00\00\00\08\00\00\00")
  (data (i32.const 600) "\01\02\03\04")
  (data (i32.const 40) "\09\00\00\00")
  (func (export "app_init")
    (local $shader i32)
    (call $genBuffers (i32.const 2) (i32.const 16))
    (call $bindBuffer (i32.const 0x8892) (i32.load (i32.const 20)))
    (call $bufferData (i32.const 0x8892) (i32.const 4) (i32.const 600) (i32.const 0x88E4))
    (local.set $shader (call $createShader (i32.const 0x8B31)))
    (i32.store (i32.const 32) (local.get $shader))
    (call $shaderSource (local.get $shader) (i32.const 2) (i32.const 512) (i32.const 520))
    (call $compileShader (local.get $shader))
    (call $getShaderiv (local.get $shader) (i32.const 0x8B81) (i32.const 36))
    (call $drawArrays (i32.const 4) (i32.const 0) (i32.const 3)))
  (func (export "bad_bind")
    (call $bindBuffer (i32.const 0x8892) (i32.const 7)))
  (func (export "unbind")
    (call $bindBuffer (i32.const 0x8892) (i32.const 0)))
  (func (export "delete_first")
    (call $deleteBuffers (i32.const 1) (i32.const 16)))
  (func (export "delete_unknown")
    (call $deleteBuffers (i32.const 1) (i32.const 40)))
  (func (export "gen_out_of_range")
    (call $genBuffers (i32.const 4) (i32.const 65530)))
)
"#;

#[test]
fn gl_imports_drive_the_driver_through_handles() {
    let mut guest = load(GL_GUEST);
    assert_eq!(guest.call("app_init").unwrap(), RunState::Running);

    let memory = guest.memory().unwrap();
    assert_eq!(&memory[16..24], &[1, 0, 0, 0, 2, 0, 0, 0]);
    assert_eq!(read_u32(memory, 32), 1);
    assert_eq!(read_u32(memory, 36), 1);

    let driver = guest.bridge().gl.driver();
    let calls = driver.calls();
    assert!(calls.contains(&"bindBuffer(0x8892, 2)".to_string()));
    assert!(calls.contains(&"bufferData(0x8892, 4 bytes, 0x88e4)".to_string()));
    assert!(calls.contains(&"shaderSource(3, 13 bytes)".to_string()));
    assert_eq!(driver.draw_calls(), 1);
    assert_eq!(guest.bridge().gl.live(ResourceKind::Buffer), 2);
}

#[test]
fn unknown_handle_traps_with_the_import_name() {
    let mut guest = load(GL_GUEST);
    guest.call("app_init").unwrap();

    match guest.call("bad_bind") {
        Err(Error::Import { import, source }) => {
            assert_eq!(import, "bindBuffer");
            assert!(matches!(
                source,
                BridgeError::InvalidHandle {
                    kind: ResourceKind::Buffer,
                    handle: 7
                }
            ));
        }
        other => panic!("expected an import error, got {other:?}"),
    }
}

#[test]
fn handle_zero_unbinds() {
    let mut guest = load(GL_GUEST);
    guest.call("app_init").unwrap();
    guest.call("unbind").unwrap();

    let calls = guest.bridge().gl.driver().calls();
    assert_eq!(calls.last().unwrap(), "bindBuffer(0x8892, 0)");
}

#[test]
fn batch_delete_is_idempotent_and_reports_unknown_ids() {
    let mut guest = load(GL_GUEST);
    guest.call("app_init").unwrap();
    guest.call("delete_first").unwrap();
    guest.call("delete_first").unwrap();
    assert_eq!(guest.bridge().gl.live(ResourceKind::Buffer), 1);
    let deletes = guest
        .bridge()
        .gl
        .driver()
        .calls()
        .iter()
        .filter(|call| call.as_str() == "deleteBuffer(1)")
        .count();
    assert_eq!(deletes, 1);

    let err = guest.call("delete_unknown").unwrap_err();
    match err.bridge_error() {
        Some(BridgeError::BatchFailed { failed, .. }) => assert_eq!(failed, &vec![9]),
        other => panic!("expected a batch failure, got {other:?}"),
    }
}

#[test]
fn out_of_range_output_array_fails_before_allocating() {
    let mut guest = load(GL_GUEST);
    let err = guest.call("gen_out_of_range").unwrap_err();
    assert!(matches!(
        err.bridge_error(),
        Some(BridgeError::OutOfRange { .. })
    ));
    assert_eq!(guest.bridge().gl.live(ResourceKind::Buffer), 0);
}

#[test]
fn unported_import_links_but_traps_when_called() {
    let mut guest = load(
        r#"
        (module
          (import "env" "hint" (func $hint (param i32 i32)))
          (memory (export "memory") 1)
          (func (export "use_hint")
            (call $hint (i32.const 0x8192) (i32.const 0x1102))))
        "#,
    );

    match guest.call("use_hint") {
        Err(Error::Import { import, source }) => {
            assert_eq!(import, "hint");
            assert!(matches!(source, BridgeError::NotImplemented("hint")));
        }
        other => panic!("expected NotImplemented, got {other:?}"),
    }
}

#[test]
fn unknown_imports_fail_instantiation() {
    let result = BridgeRuntime::new(BridgeConfig::default()).unwrap().load(
        r#"
        (module
          (import "env" "glDoesNotExist" (func))
          (memory (export "memory") 1))
        "#,
        HeadlessDriver::default(),
        Box::new(SilentTransport),
    );
    assert!(matches!(result, Err(Error::Wasm(_))));
}

const PLATFORM_GUEST: &str = r#"
(module
  (import "env" "wasm_log_write" (func $log_write (param i32 i32)))
  (import "env" "wasm_log_flush" (func $log_flush))
  (import "env" "wasm_panic" (func $panic (param i32 i32)))
  (import "env" "wasm_quit" (func $quit))
  (import "env" "now_f64" (func $now (result f64)))
  (import "env" "meta_getScreenW" (func $screen_w (result i32)))
  (import "env" "wasm_getScreenH" (func $screen_h (result i32)))
  (import "env" "createBuffer" (func $createBuffer (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 64) "hello from the guest")
  (data (i32.const 128) "boom")
  (func (export "log")
    (call $log_write (i32.const 64) (i32.const 5))
    (call $log_write (i32.const 69) (i32.const 15)))
  (func (export "flush")
    (call $log_flush))
  (func (export "panic")
    (call $panic (i32.const 128) (i32.const 4)))
  (func (export "quit")
    (drop (call $createBuffer))
    (call $quit)
    (unreachable))
  (func (export "query")
    (f64.store (i32.const 0) (call $now))
    (i32.store (i32.const 8) (call $screen_w))
    (i32.store (i32.const 12) (call $screen_h)))
)
"#;

#[test]
fn log_output_accumulates_until_flush() {
    let mut guest = load(PLATFORM_GUEST);
    guest.call("log").unwrap();
    assert_eq!(guest.bridge().console.pending(), "hello from the guest");

    guest.call("flush").unwrap();
    assert_eq!(guest.bridge().console.pending(), "");
}

#[test]
fn panic_carries_the_guest_message() {
    let mut guest = load(PLATFORM_GUEST);
    match guest.call("panic") {
        Err(Error::GuestPanic(message)) => assert_eq!(message, "boom"),
        other => panic!("expected a guest panic, got {other:?}"),
    }
}

#[test]
fn quit_tears_the_bridge_down() {
    let mut guest = load(PLATFORM_GUEST);
    assert_eq!(guest.call("quit").unwrap(), RunState::Exited);
    assert!(guest.bridge().quit_requested());
    assert_eq!(guest.bridge().gl.driver().live_objects(), 0);
    assert_eq!(guest.state(), RunState::Exited);

    // Nothing runs after exit.
    assert_eq!(guest.call("log").unwrap(), RunState::Exited);
    assert!(guest.memory().is_err());
}

#[test]
fn clock_and_screen_size_queries() {
    let mut guest = load(PLATFORM_GUEST);
    guest.call("query").unwrap();

    let memory = guest.memory().unwrap();
    let now = f64::from_le_bytes(memory[0..8].try_into().unwrap());
    assert!(now > 1.6e12, "now_f64 returned {now}");
    assert_eq!(read_u32(memory, 8), 320);
    assert_eq!(read_u32(memory, 12), 200);
}

#[test]
fn get_string_goes_through_the_guest_allocator() {
    let mut guest = load(
        r#"
        (module
          (import "env" "getStringJs" (func $getString (param i32)))
          (memory (export "memory") 1)
          (func (export "getString_alloc") (param $len i32) (result i32)
            (i32.store (i32.const 0) (local.get $len))
            (i32.const 1024))
          (func (export "query_version")
            (call $getString (i32.const 0x1F02))))
        "#,
    );
    guest.call("query_version").unwrap();

    let expected = b"WebGL 2.0 (zg headless)";
    let memory = guest.memory().unwrap();
    assert_eq!(read_u32(memory, 0) as usize, expected.len());
    assert_eq!(&memory[1024..1024 + expected.len()], expected);
}

#[test]
fn null_string_allocation_traps() {
    let mut guest = load(
        r#"
        (module
          (import "env" "getStringJs" (func $getString (param i32)))
          (memory (export "memory") 1)
          (func (export "getString_alloc") (param i32) (result i32)
            (i32.const 0))
          (func (export "query_version")
            (call $getString (i32.const 0x1F02))))
        "#,
    );
    let err = guest.call("query_version").unwrap_err();
    assert!(matches!(
        err.bridge_error(),
        Some(BridgeError::AllocationFailure { .. })
    ));
}

#[test]
fn custom_import_module_and_memory_name() {
    let config = BridgeConfig::from_toml(
        r#"
        [guest]
        import_module = "zg"
        memory_export = "heap"
        "#,
    )
    .unwrap();
    let mut guest = load_with(
        r#"
        (module
          (import "zg" "createProgram" (func $createProgram (result i32)))
          (memory (export "heap") 1)
          (func (export "app_init")
            (i32.store (i32.const 4) (call $createProgram))))
        "#,
        config,
    );
    guest.call("app_init").unwrap();
    assert_eq!(read_u32(guest.memory().unwrap(), 4), 1);
}

#[test]
fn wasi_imports_are_linked_when_enabled() {
    let config = BridgeConfig::from_toml("[guest]\nwasi = true\n").unwrap();
    let mut guest = load_with(
        r#"
        (module
          (import "wasi_snapshot_preview1" "args_sizes_get"
            (func $args_sizes_get (param i32 i32) (result i32)))
          (memory (export "memory") 1)
          (func (export "app_init")
            (i32.store (i32.const 0)
              (call $args_sizes_get (i32.const 16) (i32.const 20)))))
        "#,
        config,
    );
    guest.call("app_init").unwrap();
    assert_eq!(read_u32(guest.memory().unwrap(), 0), 0);
}
