//! # zg-net
//!
//! Socket sessions and host event delivery for the zg host bridge.
//!
//! - [`SocketManager`] owns the guest's sockets behind dense session ids.
//! - [`SocketTransport`] is the seam to the network; [`WsTransport`] speaks
//!   WebSocket through `tungstenite`.
//! - [`EventRouter`] drains host events into guest entry points, staging
//!   inbound payloads through the guest allocator.
//! - [`InputSource`] queues keyboard and mouse input.

mod input;
mod router;
mod session;
mod transport;
mod ws;

pub use input::InputSource;
pub use router::{EventRouter, RouterStats};
pub use session::{SocketManager, SocketSession};
pub use transport::{MessageStream, OutboundMessage, SocketTransport};
pub use ws::WsTransport;
