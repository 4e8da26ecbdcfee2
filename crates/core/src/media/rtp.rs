use crate::error::{Result, RtspError};

/// Length of the fixed RTP header, before CSRCs and extensions.
pub const MIN_HEADER_LEN: usize = 12;

/// Parsed view over one received RTP packet (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |                 CSRC identifiers (4 * CC bytes)               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  extension id (16)            |  extension length in words    |  ← only if X
/// |                 extension data (4 * length bytes)             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Borrows the chunk; nothing outlives the handling of one packet.
#[derive(Debug, Clone, Copy)]
pub struct RtpPacketView<'a> {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub csrc_count: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    /// Offset of the first payload byte, past CSRCs and any extension.
    pub payload_offset: usize,
    payload_end: usize,
    data: &'a [u8],
}

fn malformed(reason: &'static str) -> RtspError {
    RtspError::MalformedPacket { reason }
}

impl<'a> RtpPacketView<'a> {
    /// Validate the header lengths of `data` and return a view over it.
    ///
    /// Fails with [`RtspError::MalformedPacket`] when the fixed header, the
    /// CSRC list, the extension or the padding run past the end of the chunk.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < MIN_HEADER_LEN {
            return Err(malformed("RTP packet shorter than fixed header"));
        }

        let version = data[0] >> 6;
        let padding = (data[0] >> 5) & 0x01 == 1;
        let extension = (data[0] >> 4) & 0x01 == 1;
        let csrc_count = data[0] & 0x0f;
        let marker = (data[1] >> 7) == 1;
        let payload_type = data[1] & 0x7f;
        let sequence = u16::from_be_bytes([data[2], data[3]]);
        let timestamp = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let ssrc = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let mut payload_offset = MIN_HEADER_LEN + 4 * usize::from(csrc_count);
        if extension {
            if data.len() < payload_offset + 4 {
                return Err(malformed("RTP extension header past end of packet"));
            }
            let words = u16::from_be_bytes([data[payload_offset + 2], data[payload_offset + 3]]);
            payload_offset += 4 + 4 * usize::from(words);
        }
        if data.len() < payload_offset {
            return Err(malformed("RTP payload start past end of packet"));
        }

        let mut payload_end = data.len();
        if padding {
            let pad = usize::from(data[data.len() - 1]);
            if pad == 0 || payload_end - payload_offset < pad {
                return Err(malformed("invalid RTP padding length"));
            }
            payload_end -= pad;
        }

        Ok(RtpPacketView {
            version,
            padding,
            extension,
            csrc_count,
            marker,
            payload_type,
            sequence,
            timestamp,
            ssrc,
            payload_offset,
            payload_end,
            data,
        })
    }

    /// Payload with the header and any padding stripped.
    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.payload_offset..self.payload_end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed header with the given first byte, PT 96 with marker, seq 0x1234.
    fn packet(first_byte: u8, extra_header: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut p = vec![
            first_byte, 0x80 | 96, 0x12, 0x34, 0x00, 0x01, 0x5f, 0x90, 0xaa, 0xbb, 0xcc, 0xdd,
        ];
        p.extend_from_slice(extra_header);
        p.extend_from_slice(payload);
        p
    }

    #[test]
    fn plain_header_fields() {
        let data = packet(0x80, &[], &[0x65, 1, 2, 3]);
        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.version, 2);
        assert!(!view.padding);
        assert!(!view.extension);
        assert_eq!(view.csrc_count, 0);
        assert!(view.marker);
        assert_eq!(view.payload_type, 96);
        assert_eq!(view.sequence, 0x1234);
        assert_eq!(view.timestamp, 90_000);
        assert_eq!(view.ssrc, 0xaabbccdd);
        assert_eq!(view.payload_offset, 12);
        assert_eq!(view.payload(), &[0x65, 1, 2, 3]);
    }

    #[test]
    fn csrcs_shift_payload() {
        let data = packet(0x82, &[0; 8], &[0x41]);
        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.csrc_count, 2);
        assert_eq!(view.payload_offset, 20);
        assert_eq!(view.payload(), &[0x41]);
    }

    #[test]
    fn extension_after_csrcs() {
        let mut extra = vec![0; 8];
        extra.extend_from_slice(&[0xbe, 0xde, 0x00, 0x03]);
        extra.extend_from_slice(&[0xee; 12]);
        let data = packet(0x92, &extra, &[0x41, 0x42]);
        let view = RtpPacketView::parse(&data).unwrap();
        assert!(view.extension);
        assert_eq!(view.payload_offset, 20 + 4 + 3 * 4);
        assert_eq!(view.payload(), &[0x41, 0x42]);
    }

    #[test]
    fn padding_is_stripped() {
        let data = packet(0xa0, &[], &[0x41, 0x42, 0x00, 0x00, 0x03]);
        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.payload(), &[0x41, 0x42]);
    }

    #[test]
    fn truncated_packets_are_rejected() {
        assert!(RtpPacketView::parse(&[0x80, 96, 0, 1]).is_err());
        // Two CSRCs announced, one present.
        assert!(RtpPacketView::parse(&packet(0x82, &[0; 4], &[])).is_err());
        // Extension of 3 words announced, 1 present.
        assert!(RtpPacketView::parse(&packet(0x90, &[0, 0, 0, 3, 0, 0, 0, 0], &[])).is_err());
        // Extension bit set with no extension header.
        assert!(RtpPacketView::parse(&packet(0x90, &[], &[])).is_err());
        // Padding longer than the payload.
        assert!(RtpPacketView::parse(&packet(0xa0, &[], &[0x41, 0x09])).is_err());
    }

    #[test]
    fn empty_payload_is_valid() {
        let data = packet(0x80, &[], &[]);
        assert!(RtpPacketView::parse(&data).unwrap().payload().is_empty());
    }
}
