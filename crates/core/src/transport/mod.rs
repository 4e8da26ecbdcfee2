//! Network transport for RTSP signaling and interleaved media.
//!
//! With interleaved transport (RFC 2326 §10.12) everything travels over one
//! TCP connection: RTSP requests and responses as text, RTP/RTCP as binary
//! chunks framed with `$`:
//!
//! ```text
//! +------+---------+----------------+----------------+
//! | '$'  | channel | length (be16)  | length bytes   |
//! +------+---------+----------------+----------------+
//! ```
//!
//! The session core only sees the [`Transport`] trait and the
//! [`TransportEvent`]s it produces; [`tcp::TcpTransport`] is the socket
//! implementation.

pub mod tcp;

use crate::error::Result;
use crate::protocol::{RtspRequest, RtspResponse};

pub use tcp::TcpTransport;

/// Outbound side of a transport. Sends never block the caller.
pub trait Transport: Send + Sync {
    /// Queue a request. The transport assigns its `CSeq` and remembers it
    /// so the reply can be paired in [`TransportEvent::Message`].
    fn send_message(&self, request: RtspRequest) -> Result<()>;

    /// Queue a `$`-framed binary chunk on an interleaved channel.
    fn send_raw(&self, channel: u8, payload: &[u8]) -> Result<()>;

    /// Close the connection. Later sends fail; a
    /// [`TransportEvent::Closed`] may or may not follow.
    fn close(&self);

    fn is_connected(&self) -> bool;
}

/// Inbound side of a transport, delivered in arrival order.
#[derive(Debug)]
pub enum TransportEvent {
    /// A response, together with the request it answers.
    Message {
        response: RtspResponse,
        request: RtspRequest,
    },
    /// One interleaved binary chunk.
    Data { channel: u8, payload: Vec<u8> },
    /// The connection is gone.
    Closed { reason: String },
}
