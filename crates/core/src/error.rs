//! Error types for the RTSP client library.

use std::fmt;

use crate::protocol::Method;

/// Errors that can occur in the RTSP client library.
///
/// Variants map to the failure modes of a client session:
///
/// - **Connection**: [`ConnectFailure`](Self::ConnectFailure),
///   [`Io`](Self::Io), [`TransportClosed`](Self::TransportClosed).
/// - **Signaling**: [`Protocol`](Self::Protocol) for non-2xx replies,
///   [`AuthFailure`](Self::AuthFailure) for a rejected credential retry,
///   [`Parse`](Self::Parse) for malformed RTSP messages.
/// - **Media**: [`MalformedPacket`](Self::MalformedPacket) for truncated
///   RTP/RTCP chunks.
///
/// A session that negotiates no usable video track is not an error; it
/// ends up in [`SessionState::Idle`](crate::session::SessionState::Idle).
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TCP connect to the server timed out or was refused.
    #[error("failed to connect to {addr}: {reason}")]
    ConnectFailure { addr: String, reason: String },

    /// The server answered a request with a non-success status other than 401.
    #[error("{method} failed: {status} {reason}")]
    Protocol {
        method: Method,
        status: u16,
        reason: String,
    },

    /// The server answered 401 to a request that already carried credentials,
    /// or no credentials could be built for the challenge.
    #[error("authentication failed for {method}")]
    AuthFailure { method: Method },

    /// The session URL is not an `rtsp://` URL with a usable host.
    #[error("invalid RTSP URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse an RTSP message (RFC 2326 §6, §7).
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// An RTP or RTCP chunk was too short for the header it claims.
    #[error("malformed packet: {reason}")]
    MalformedPacket { reason: &'static str },

    /// The transport has been closed; nothing more can be sent.
    #[error("transport closed")]
    TransportClosed,
}

/// Specific kind of RTSP parse failure.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// Input was empty (no start line).
    EmptyMessage,
    /// Status line did not have the expected `RTSP/1.0 Code Reason` format.
    InvalidStatusLine,
    /// Request line did not have the expected `Method URI Version` format.
    InvalidRequestLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// `Content-Length` was present but not a number.
    InvalidContentLength,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidContentLength => write!(f, "invalid content length"),
        }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
