//! RTCP packet walking and receiver reports (RFC 3550 §6).
//!
//! An interleaved control chunk holds one or more RTCP packets back to back.
//! Each starts with a 4-byte common header:
//!
//! ```text
//!  0                   1                   2                   3
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|   RC    |      PT       |     length (words - 1)        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        SSRC of sender                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::error::{Result, RtspError};

/// Sender Report (RFC 3550 §6.4.1).
pub const SENDER_REPORT: u8 = 200;
/// Receiver Report (RFC 3550 §6.4.2).
pub const RECEIVER_REPORT: u8 = 201;

/// Common header of one RTCP packet within a compound chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcpReport {
    /// Offset of this packet within the chunk.
    pub offset: usize,
    pub packet_type: u8,
    /// Packet length in 32-bit words, minus one.
    pub length_words: u16,
    /// Sender SSRC, when the packet is long enough to carry one.
    pub ssrc: Option<u32>,
}

impl RtcpReport {
    /// Offset of the packet following this one.
    pub fn next_offset(&self) -> usize {
        self.offset + (usize::from(self.length_words) + 1) * 4
    }
}

/// Iterator over the RTCP packets of one chunk.
///
/// Yields `Err` and stops when a header or a declared length runs past the
/// end of the chunk.
pub struct RtcpPackets<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> RtcpPackets<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        RtcpPackets {
            data,
            offset: 0,
            done: false,
        }
    }
}

impl Iterator for RtcpPackets<'_> {
    type Item = Result<RtcpReport>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }

        let rest = &self.data[self.offset..];
        if rest.len() < 4 {
            self.done = true;
            return Some(Err(RtspError::MalformedPacket {
                reason: "RTCP header past end of chunk",
            }));
        }

        let report = RtcpReport {
            offset: self.offset,
            packet_type: rest[1],
            length_words: u16::from_be_bytes([rest[2], rest[3]]),
            ssrc: rest
                .get(4..8)
                .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        };

        if report.next_offset() > self.data.len() {
            self.done = true;
            return Some(Err(RtspError::MalformedPacket {
                reason: "RTCP length past end of chunk",
            }));
        }

        self.offset = report.next_offset();
        Some(Ok(report))
    }
}

/// An empty Receiver Report (no report blocks) from `ssrc`.
///
/// ```
/// let rr = rtsp_client::media::rtcp::empty_receiver_report(0x0102_0304);
/// assert_eq!(rr, [0x80, 201, 0x00, 0x01, 0x01, 0x02, 0x03, 0x04]);
/// ```
pub fn empty_receiver_report(ssrc: u32) -> [u8; 8] {
    let version: u8 = 2;
    let report_count: u8 = 0;
    let length_words: u16 = (8 / 4) - 1;

    let mut report = [0u8; 8];
    report[0] = (version << 6) | report_count;
    report[1] = RECEIVER_REPORT;
    report[2..4].copy_from_slice(&length_words.to_be_bytes());
    report[4..8].copy_from_slice(&ssrc.to_be_bytes());
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rtcp_packet(packet_type: u8, length_words: u16) -> Vec<u8> {
        let mut p = vec![0x80, packet_type];
        p.extend_from_slice(&length_words.to_be_bytes());
        p.extend_from_slice(&0x1122_3344u32.to_be_bytes());
        p.resize((usize::from(length_words) + 1) * 4, 0);
        p
    }

    #[test]
    fn walks_compound_chunk() {
        let shape = [(200u8, 6u16), (202, 4), (203, 1), (201, 7)];
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for (pt, len) in shape {
            offsets.push(data.len());
            data.extend(rtcp_packet(pt, len));
        }

        let reports: Vec<RtcpReport> = RtcpPackets::new(&data).map(|r| r.unwrap()).collect();
        assert_eq!(reports.len(), shape.len());
        for ((report, (pt, len)), offset) in reports.iter().zip(shape).zip(offsets) {
            assert_eq!(report.packet_type, pt);
            assert_eq!(report.length_words, len);
            assert_eq!(report.offset, offset);
            assert_eq!(report.ssrc, Some(0x1122_3344));
        }
    }

    #[test]
    fn zero_length_packet_has_no_ssrc() {
        let data = [0x80, 204, 0x00, 0x00];
        let reports: Vec<_> = RtcpPackets::new(&data).collect();
        assert_eq!(reports.len(), 1);
        let report = reports[0].as_ref().unwrap();
        assert_eq!(report.ssrc, None);
        assert_eq!(report.next_offset(), 4);
    }

    #[test]
    fn truncated_packet_stops_walk() {
        let mut data = rtcp_packet(200, 6);
        data.extend_from_slice(&[0x80, 202, 0x00, 0x09, 0, 0, 0, 0]);
        let results: Vec<_> = RtcpPackets::new(&data).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());

        let results: Vec<_> = RtcpPackets::new(&[0x80, 200]).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn receiver_report_layout() {
        let rr = empty_receiver_report(0xdead_beef);
        assert_eq!(rr, [0x80, 201, 0x00, 0x01, 0xde, 0xad, 0xbe, 0xef]);
        let parsed: Vec<_> = RtcpPackets::new(&rr).map(|r| r.unwrap()).collect();
        assert_eq!(parsed[0].packet_type, RECEIVER_REPORT);
        assert_eq!(parsed[0].ssrc, Some(0xdead_beef));
    }
}
