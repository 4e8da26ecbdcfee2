//! Received media: RTP/RTCP parsing and delivery to a [`FrameSink`].
//!
//! ## RTP overview (RFC 3550)
//!
//! With interleaved transport (RFC 2326 §10.12) the server sends RTP and
//! RTCP over the RTSP connection itself, each chunk tagged with a channel
//! number negotiated in SETUP. The [`interpreter::Interpreter`] routes each
//! chunk by channel:
//!
//! - **data channel**: one RTP packet ([`rtp::RtpPacketView`]); the payload
//!   goes to the sink unchanged, one call per packet.
//! - **control channel**: one or more RTCP packets ([`rtcp::RtcpPackets`]);
//!   every Sender Report is answered with an empty Receiver Report.
//!
//! ## Supported codecs
//!
//! | Codec | Module | RFC |
//! |-------|--------|-----|
//! | H.264 | [`h264`] | [RFC 6184](https://tools.ietf.org/html/rfc6184) |

pub mod h264;
pub mod interpreter;
pub mod rtcp;
pub mod rtp;

/// H.264 codec configuration (RFC 6184 §8.1 `sprop-parameter-sets`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSets {
    /// Sequence Parameter Set NAL unit, without start code.
    pub sps: Vec<u8>,
    /// Picture Parameter Set NAL unit, without start code.
    pub pps: Vec<u8>,
}

/// Downstream consumer of decoded video.
///
/// Called from the client's session task, so implementations should hand
/// data off quickly rather than block.
pub trait FrameSink: Send + Sync {
    /// Codec configuration, delivered at most once per session before any frame.
    fn on_parameter_sets(&self, parameter_sets: &ParameterSets);

    /// One RTP payload from the negotiated track, RTP header stripped.
    ///
    /// Fragmented NAL units (FU-A) arrive as the individual fragments; the
    /// marker bit and timestamp needed to reassemble them are not passed on.
    fn on_frame_data(&self, payload: &[u8]);
}
