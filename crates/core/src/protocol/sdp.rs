//! SDP (Session Description Protocol) negotiation (RFC 4566 / RFC 8866).
//!
//! Reads the SDP body returned by DESCRIBE and picks the video track to set
//! up. Only the parts of the grammar a camera's description needs are
//! understood:
//!
//! ```text
//! v=0
//! o=- 1 1 IN IP4 192.168.1.10
//! s=Session
//! t=0 0
//! m=audio 0 RTP/AVP 0                           ← skipped, not video
//! m=video 0 RTP/AVP 96                          ← first video block
//! a=control:track1                              ← track control URL
//! a=rtpmap:96 H264/90000                        ← codec/clock rate
//! a=fmtp:96 packetization-mode=1;sprop-parameter-sets=Z0IAKeKQ,aM48gA==
//! ```
//!
//! Only the **first** `m=video` block is considered. If its codec is not
//! supported no track is negotiated, even when a later video block would
//! have been usable.

use crate::media::ParameterSets;
use crate::media::h264;

/// Interleaved channel carrying RTP for the negotiated track.
pub const DATA_CHANNEL: u8 = 0;
/// Interleaved channel carrying RTCP for the negotiated track.
pub const CONTROL_CHANNEL: u8 = 1;

/// The video track chosen from a session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackNegotiation {
    /// Codec name as it appears in `a=rtpmap` (e.g. `"H264"`).
    pub codec: String,
    /// RTP payload type (0–127) from `a=rtpmap`.
    pub payload_type: u8,
    /// Interleaved channel for RTP data.
    pub data_channel: u8,
    /// Interleaved channel for RTCP.
    pub control_channel: u8,
    /// Absolute URL to SETUP.
    pub control_url: String,
}

/// Result of reading one DESCRIBE body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub track: Option<TrackNegotiation>,
    pub parameter_sets: Option<ParameterSets>,
}

/// One `m=` block and its media-level attributes.
#[derive(Debug)]
struct MediaDescription<'a> {
    media: &'a str,
    attributes: Vec<(&'a str, &'a str)>,
}

/// Split an SDP document into media descriptions.
///
/// Session-level lines before the first `m=` are ignored.
fn media_descriptions(body: &str) -> Vec<MediaDescription<'_>> {
    let mut medias: Vec<MediaDescription<'_>> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(m) = line.strip_prefix("m=") {
            medias.push(MediaDescription {
                media: m.split_whitespace().next().unwrap_or(""),
                attributes: Vec::new(),
            });
        } else if let Some(attr) = line.strip_prefix("a=")
            && let Some(current) = medias.last_mut()
        {
            let (name, value) = attr.split_once(':').unwrap_or((attr, ""));
            current.attributes.push((name.trim(), value.trim()));
        }
    }

    medias
}

/// Resolve an `a=control` value against the DESCRIBE response (RFC 2326 §C.1.1).
fn resolve_control(control: Option<&str>, content_base: Option<&str>, request_url: &str) -> String {
    let base = content_base.unwrap_or(request_url);
    match control {
        None | Some("") | Some("*") => base.to_string(),
        Some(c) if c.get(..7).is_some_and(|s| s.eq_ignore_ascii_case("rtsp://")) => {
            c.to_string()
        }
        Some(c) => match content_base {
            Some(content_base) => format!("{content_base}{c}"),
            None => format!("{request_url}/{c}"),
        },
    }
}

/// Parse `a=rtpmap:<pt> <encoding>/<clock>[/<params>]` into (pt, encoding).
fn parse_rtpmap(value: &str) -> Option<(u8, &str)> {
    let (pt, encoding) = value.split_once(' ')?;
    let pt: u8 = pt.trim().parse().ok().filter(|pt| *pt <= 127)?;
    let name = encoding.trim().split('/').next()?;
    Some((pt, name))
}

/// Pick the track to set up from a DESCRIBE response body.
///
/// `content_base` is the response's `Content-Base` header, `request_url` the
/// URL the DESCRIBE was sent to.
pub fn negotiate(body: &str, content_base: Option<&str>, request_url: &str) -> Negotiation {
    let Some(video) = media_descriptions(body)
        .into_iter()
        .find(|m| m.media == "video")
    else {
        tracing::debug!("SDP has no video media description");
        return Negotiation::default();
    };

    let mut control = None;
    let mut codec = None;
    let mut fmtps = Vec::new();

    for &(name, value) in &video.attributes {
        match name {
            "control" => control = Some(value),
            "rtpmap" => match parse_rtpmap(value) {
                Some((pt, name)) if h264::is_supported_codec(name) => {
                    codec = Some((pt, h264::CODEC_NAME));
                }
                Some((pt, name)) => {
                    tracing::debug!(pt, codec = name, "ignoring unsupported video codec");
                }
                None => tracing::warn!(rtpmap = value, "malformed rtpmap attribute"),
            },
            "fmtp" => fmtps.push(value),
            _ => {}
        }
    }

    let Some((payload_type, codec)) = codec else {
        tracing::warn!("first video media description has no supported codec");
        return Negotiation::default();
    };

    let parameter_sets = fmtps
        .iter()
        .filter_map(|fmtp| fmtp.split_once(' '))
        .find(|(pt, _)| pt.trim().parse::<u8>().ok() == Some(payload_type))
        .and_then(|(_, params)| h264::parameter_sets_from_fmtp(params));

    let track = TrackNegotiation {
        codec: codec.to_string(),
        payload_type,
        data_channel: DATA_CHANNEL,
        control_channel: CONTROL_CHANNEL,
        control_url: resolve_control(control, content_base, request_url),
    };

    tracing::debug!(
        codec = %track.codec,
        payload_type,
        control_url = %track.control_url,
        has_parameter_sets = parameter_sets.is_some(),
        "negotiated video track"
    );

    Negotiation {
        track: Some(track),
        parameter_sets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "rtsp://192.168.1.10/stream";

    fn camera_sdp() -> String {
        [
            "v=0",
            "o=- 1 1 IN IP4 192.168.1.10",
            "s=Session",
            "t=0 0",
            "a=control:*",
            "m=audio 0 RTP/AVP 0",
            "a=control:track0",
            "a=rtpmap:0 PCMU/8000",
            "m=video 0 RTP/AVP 96",
            "a=control:track1",
            "a=rtpmap:96 H264/90000",
            "a=fmtp:96 packetization-mode=1;sprop-parameter-sets=AAAA,BBBB",
            "",
        ]
        .join("\r\n")
    }

    #[test]
    fn negotiates_h264_track_and_parameter_sets() {
        let n = negotiate(&camera_sdp(), None, URL);
        let track = n.track.expect("track negotiated");
        assert_eq!(track.codec, "H264");
        assert_eq!(track.payload_type, 96);
        assert_eq!(track.data_channel, 0);
        assert_eq!(track.control_channel, 1);
        assert_eq!(track.control_url, "rtsp://192.168.1.10/stream/track1");

        let sets = n.parameter_sets.expect("parameter sets");
        assert_eq!(sets.sps, vec![0, 0, 0]);
        assert_eq!(sets.pps, vec![0x04, 0x10, 0x41]);
    }

    #[test]
    fn first_video_block_wins_even_if_unsupported() {
        let sdp = "v=0\r\n\
                   m=video 0 RTP/AVP 97\r\n\
                   a=rtpmap:97 VP8/90000\r\n\
                   a=control:track1\r\n\
                   m=video 0 RTP/AVP 96\r\n\
                   a=rtpmap:96 H264/90000\r\n\
                   a=control:track2\r\n";
        assert_eq!(negotiate(sdp, None, URL), Negotiation::default());
    }

    #[test]
    fn later_video_blocks_are_ignored() {
        let sdp = "m=video 0 RTP/AVP 96\r\na=rtpmap:96 H264/90000\r\na=control:a\r\n\
                   m=video 0 RTP/AVP 98\r\na=rtpmap:98 H264/90000\r\na=control:b\r\n";
        let track = negotiate(sdp, None, URL).track.unwrap();
        assert_eq!(track.payload_type, 96);
        assert!(track.control_url.ends_with("/a"));
    }

    #[test]
    fn control_resolution() {
        assert_eq!(
            resolve_control(Some("rtsp://other/track9"), Some("rtsp://base/"), URL),
            "rtsp://other/track9"
        );
        assert_eq!(
            resolve_control(Some("RTSP://other/track9"), None, URL),
            "RTSP://other/track9"
        );
        assert_eq!(
            resolve_control(Some("trackID=1"), Some("rtsp://base/stream/"), URL),
            "rtsp://base/stream/trackID=1"
        );
        assert_eq!(
            resolve_control(Some("trackID=1"), None, URL),
            "rtsp://192.168.1.10/stream/trackID=1"
        );
        assert_eq!(resolve_control(None, None, URL), URL);
        assert_eq!(resolve_control(Some("*"), Some("rtsp://base/"), URL), "rtsp://base/");
    }

    #[test]
    fn non_ascii_control_is_relative() {
        let sdp = "m=video 0 RTP/AVP 96\r\na=rtpmap:96 H264/90000\r\na=control:trackX\u{e9}\r\n";
        let track = negotiate(sdp, None, "rtsp://cam/s").track.unwrap();
        assert_eq!(track.control_url, "rtsp://cam/s/trackX\u{e9}");

        assert_eq!(
            resolve_control(Some("rtsp:/\u{fffd}x"), None, URL),
            format!("{URL}/rtsp:/\u{fffd}x")
        );
    }

    #[test]
    fn audio_only_yields_nothing() {
        let sdp = "v=0\r\nm=audio 0 RTP/AVP 0\r\na=rtpmap:0 PCMU/8000\r\n";
        assert_eq!(negotiate(sdp, None, URL), Negotiation::default());
    }

    #[test]
    fn single_sprop_entry_yields_no_parameter_sets() {
        let sdp = "m=video 0 RTP/AVP 96\r\na=rtpmap:96 H264/90000\r\n\
                   a=fmtp:96 sprop-parameter-sets=Z0IAKeKQ\r\na=control:t\r\n";
        let n = negotiate(sdp, None, URL);
        assert!(n.track.is_some());
        assert!(n.parameter_sets.is_none());
    }

    #[test]
    fn fmtp_before_rtpmap_is_still_used() {
        let sdp = "m=video 0 RTP/AVP 96\r\n\
                   a=fmtp:96 sprop-parameter-sets=Z0IAKeKQ,aM48gA==\r\n\
                   a=rtpmap:96 h264/90000\r\n";
        let n = negotiate(sdp, Some("rtsp://cam/"), URL);
        let track = n.track.unwrap();
        assert_eq!(track.codec, "H264");
        assert_eq!(track.control_url, "rtsp://cam/");
        let sets = n.parameter_sets.unwrap();
        assert_eq!(sets.sps, vec![0x67, 0x42, 0x00, 0x29, 0xe2, 0x90]);
        assert_eq!(sets.pps, vec![0x68, 0xce, 0x3c, 0x80]);
    }

    #[test]
    fn rtpmap_parsing() {
        assert_eq!(parse_rtpmap("96 H264/90000"), Some((96, "H264")));
        assert_eq!(parse_rtpmap("128 H264/90000"), None);
        assert_eq!(parse_rtpmap("H264/90000"), None);
    }
}
