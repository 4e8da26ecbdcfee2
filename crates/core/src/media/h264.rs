use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::ParameterSets;

/// Encoding name of the one supported video codec (RFC 6184 §8.1).
pub const CODEC_NAME: &str = "H264";

/// Annex B start code, for writing parameter sets and NAL units to a byte stream.
pub const ANNEX_B_START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Whether an `a=rtpmap` encoding name is one this client can receive.
///
/// Encoding names are case-insensitive (RFC 4855 §3).
pub fn is_supported_codec(encoding_name: &str) -> bool {
    encoding_name.eq_ignore_ascii_case(CODEC_NAME)
}

/// NAL unit type from the first payload byte (RFC 6184 §5.3).
///
/// 1–23 are single NAL units, 24 is STAP-A, 28 is FU-A.
pub fn nal_unit_type(payload: &[u8]) -> Option<u8> {
    payload.first().map(|b| b & 0x1f)
}

/// Extract SPS and PPS from the parameters of an `a=fmtp` line.
///
/// `params` is the part after the payload type, e.g.
/// `packetization-mode=1;profile-level-id=42001f;sprop-parameter-sets=Z0IAH5Wo,aM4xsg==`.
/// The first two comma-separated base64 entries of `sprop-parameter-sets`
/// are the SPS and PPS (RFC 6184 §8.1). Returns `None` with fewer than two
/// entries or if either fails to decode.
pub fn parameter_sets_from_fmtp(params: &str) -> Option<ParameterSets> {
    let sprop = params
        .split(';')
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("sprop-parameter-sets"))
        .map(|(_, value)| value.trim())?;

    let mut entries = sprop.split(',').map(str::trim);
    let (Some(sps), Some(pps)) = (entries.next(), entries.next()) else {
        tracing::debug!(sprop, "sprop-parameter-sets has fewer than two entries");
        return None;
    };

    match (BASE64_STANDARD.decode(sps), BASE64_STANDARD.decode(pps)) {
        (Ok(sps), Ok(pps)) => {
            tracing::trace!(
                sps_len = sps.len(),
                pps_len = pps.len(),
                "decoded sprop-parameter-sets"
            );
            Some(ParameterSets { sps, pps })
        }
        _ => {
            tracing::warn!(sprop, "sprop-parameter-sets is not valid base64");
            None
        }
    }
}
