/// Interleaved transport parameters for SETUP (RFC 2326 §12.39, §10.12).
///
/// RTP and RTCP for the track travel over the RTSP TCP connection, each
/// chunk tagged with one of the two channel numbers.
///
/// ## Wire format example
///
/// ```text
/// Client → Server:
///   Transport: RTP/AVP/TCP;unicast;interleaved=0-1
///
/// Server → Client:
///   Transport: RTP/AVP/TCP;unicast;interleaved=0-1;ssrc=5A3C1B2E
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleavedTransport {
    /// Channel carrying RTP data.
    pub data_channel: u8,
    /// Channel carrying RTCP.
    pub control_channel: u8,
}

impl InterleavedTransport {
    pub fn new(data_channel: u8, control_channel: u8) -> Self {
        InterleavedTransport {
            data_channel,
            control_channel,
        }
    }

    /// Value for the SETUP request's `Transport` header.
    pub fn header_value(&self) -> String {
        format!(
            "RTP/AVP/TCP;unicast;interleaved={}-{}",
            self.data_channel, self.control_channel
        )
    }

    /// Parse the `Transport` header of a SETUP reply.
    ///
    /// Looks for `interleaved=DATA-CONTROL` among semicolon-separated
    /// parameters.
    ///
    /// ## Examples
    ///
    /// ```
    /// use rtsp_client::session::transport::InterleavedTransport;
    ///
    /// let t = InterleavedTransport::parse("RTP/AVP/TCP;unicast;interleaved=2-3").unwrap();
    /// assert_eq!(t.data_channel, 2);
    /// assert_eq!(t.control_channel, 3);
    ///
    /// assert!(InterleavedTransport::parse("RTP/AVP;unicast;client_port=8000-8001").is_none());
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        for part in header.split(';') {
            let part = part.trim();
            if let Some(channels) = part.strip_prefix("interleaved=") {
                let (data, control) = match channels.split_once('-') {
                    Some((data, control)) => (data.parse().ok()?, control.parse().ok()?),
                    None => {
                        let data: u8 = channels.parse().ok()?;
                        (data, data.checked_add(1)?)
                    }
                };
                return Some(InterleavedTransport::new(data, control));
            }
        }
        None
    }
}
