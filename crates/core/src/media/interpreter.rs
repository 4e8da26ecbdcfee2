use std::sync::Arc;

use crate::protocol::sdp::TrackNegotiation;
use crate::transport::Transport;

use super::h264;
use super::rtcp::{self, RtcpPackets};
use super::rtp::RtpPacketView;
use super::FrameSink;

/// Running counts of what the interpreter did with received chunks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterStats {
    pub frames_forwarded: u64,
    pub packets_discarded: u64,
    pub rtcp_packets: u64,
    pub receiver_reports_sent: u64,
}

/// Turns interleaved chunks into sink calls and RTCP receiver reports.
///
/// Reads the negotiated track but never changes it. Owns this session's
/// SSRC, which is fixed at construction.
pub struct Interpreter {
    ssrc: u32,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn FrameSink>,
    stats: InterpreterStats,
}

impl Interpreter {
    pub fn new(ssrc: u32, transport: Arc<dyn Transport>, sink: Arc<dyn FrameSink>) -> Self {
        tracing::debug!(ssrc = format_args!("{:#010X}", ssrc), "RTP interpreter created");
        Interpreter {
            ssrc,
            transport,
            sink,
            stats: InterpreterStats::default(),
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn stats(&self) -> InterpreterStats {
        self.stats
    }

    /// Handle one interleaved chunk received on `channel`.
    ///
    /// Chunks arriving before a track is negotiated, or on an unknown
    /// channel, are dropped.
    pub fn handle_chunk(&mut self, track: Option<&TrackNegotiation>, channel: u8, data: &[u8]) {
        let Some(track) = track else {
            tracing::debug!(channel, len = data.len(), "dropping chunk, no track negotiated");
            return;
        };

        if channel == track.control_channel {
            self.handle_rtcp(track, data);
        } else if channel == track.data_channel {
            self.handle_rtp(track, data);
        } else {
            tracing::debug!(channel, len = data.len(), "dropping chunk on unknown channel");
        }
    }

    fn handle_rtcp(&mut self, track: &TrackNegotiation, data: &[u8]) {
        for report in RtcpPackets::new(data) {
            let report = match report {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, len = data.len(), "dropping rest of RTCP chunk");
                    break;
                }
            };
            self.stats.rtcp_packets += 1;
            tracing::trace!(
                packet_type = report.packet_type,
                length_words = report.length_words,
                ssrc = ?report.ssrc,
                "RTCP packet"
            );

            if report.packet_type == rtcp::SENDER_REPORT {
                let rr = rtcp::empty_receiver_report(self.ssrc);
                match self.transport.send_raw(track.control_channel, &rr) {
                    Ok(()) => self.stats.receiver_reports_sent += 1,
                    Err(e) => tracing::warn!(error = %e, "failed to send RTCP receiver report"),
                }
            }
        }
    }

    fn handle_rtp(&mut self, track: &TrackNegotiation, data: &[u8]) {
        let packet = match RtpPacketView::parse(data) {
            Ok(p) => p,
            Err(e) => {
                self.stats.packets_discarded += 1;
                tracing::warn!(error = %e, len = data.len(), "dropping RTP chunk");
                return;
            }
        };

        if packet.payload_type != track.payload_type {
            self.stats.packets_discarded += 1;
            tracing::warn!(
                payload_type = packet.payload_type,
                expected = track.payload_type,
                "ignoring RTP packet with unexpected payload type"
            );
            return;
        }

        if !h264::is_supported_codec(&track.codec) {
            self.stats.packets_discarded += 1;
            tracing::warn!(codec = %track.codec, "no parser for RTP payload");
            return;
        }

        tracing::trace!(
            seq = packet.sequence,
            timestamp = packet.timestamp,
            marker = packet.marker,
            nal_type = ?h264::nal_unit_type(packet.payload()),
            len = packet.payload().len(),
            "RTP packet"
        );

        self.sink.on_frame_data(packet.payload());
        self.stats.frames_forwarded += 1;
    }
}
