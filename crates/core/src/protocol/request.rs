use std::fmt;
use std::str::FromStr;

use crate::error::{ParseErrorKind, RtspError};

/// Client identification string sent as `User-Agent` (RFC 2326 §12.41).
pub const USER_AGENT: &str = "rtsp-client-rs/0.1";

/// RTSP methods issued by the client (RFC 2326 §10).
///
/// `Announce` is only recognized, never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    Describe,
    Setup,
    Play,
    Pause,
    Teardown,
    GetParameter,
    Announce,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Describe => "DESCRIBE",
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
            Self::GetParameter => "GET_PARAMETER",
            Self::Announce => "ANNOUNCE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RtspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "OPTIONS" => Self::Options,
            "DESCRIBE" => Self::Describe,
            "SETUP" => Self::Setup,
            "PLAY" => Self::Play,
            "PAUSE" => Self::Pause,
            "TEARDOWN" => Self::Teardown,
            "GET_PARAMETER" => Self::GetParameter,
            "ANNOUNCE" => Self::Announce,
            _ => {
                return Err(RtspError::Parse {
                    kind: ParseErrorKind::InvalidRequestLine,
                });
            }
        })
    }
}

/// An outbound RTSP request (RFC 2326 §6).
///
/// RTSP requests follow HTTP/1.1 syntax:
///
/// ```text
/// Method SP Request-URI SP RTSP-Version CRLF
/// *(Header: Value CRLF)
/// CRLF
/// ```
///
/// The `CSeq` header is not stored here: the transport numbers each request
/// as it goes on the wire (see [`serialize`](Self::serialize)), so a request
/// cloned for an authentication retry gets a fresh sequence number.
///
/// Header lookup is case-insensitive per RFC 2326 §4.2.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RtspRequest {
    /// RTSP method (OPTIONS, DESCRIBE, SETUP, PLAY, etc.).
    pub method: Method,
    /// Request-URI (e.g. `rtsp://host:port/stream/track1`, or `*`).
    pub uri: String,
    /// Headers as ordered (name, value) pairs.
    pub headers: Vec<(String, String)>,
}

impl RtspRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        RtspRequest {
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Replace every header called `name` with a single `name: value`.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Attach the `Session` header (RFC 2326 §12.37) when an id is known.
    pub fn with_session(self, session_id: Option<&str>) -> Self {
        match session_id {
            Some(id) => self.add_header("Session", id),
            None => self,
        }
    }

    /// Attach an `Authorization` header when one could be built.
    pub fn with_authorization(self, authorization: Option<String>) -> Self {
        match authorization {
            Some(value) => self.add_header("Authorization", &value),
            None => self,
        }
    }

    /// Look up a header value by name (case-insensitive, per RFC 2326 §4.2).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns the CSeq header value, present only on parsed requests.
    pub fn cseq(&self) -> Option<&str> {
        self.get_header("CSeq")
    }

    /// Whether this request already carries credentials.
    pub fn has_authorization(&self) -> bool {
        self.get_header("Authorization").is_some()
    }

    /// Serialize to the RTSP text wire format with the given sequence number.
    pub fn serialize(&self, cseq: u32) -> String {
        let mut request = format!("{} {} RTSP/1.0\r\nCSeq: {}\r\n", self.method, self.uri, cseq);
        for (name, value) in &self.headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }
        request.push_str("\r\n");
        request
    }

    /// Parse an RTSP request from its text representation.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let mut lines = raw.lines();

        let request_line = lines.next().ok_or(RtspError::Parse {
            kind: ParseErrorKind::EmptyMessage,
        })?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();

        if parts.len() != 3 || !parts[2].starts_with("RTSP/") {
            return Err(RtspError::Parse {
                kind: ParseErrorKind::InvalidRequestLine,
            });
        }

        let method = parts[0].parse()?;
        let headers = parse_header_lines(lines)?;

        Ok(RtspRequest {
            method,
            uri: parts[1].to_string(),
            headers,
        })
    }
}

/// Parse `Name: value` lines up to the first empty line.
pub(crate) fn parse_header_lines<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> crate::error::Result<Vec<(String, String)>> {
    let mut headers = Vec::new();

    for line in lines {
        if line.is_empty() {
            break;
        }

        let colon_pos = line.find(':').ok_or(RtspError::Parse {
            kind: ParseErrorKind::InvalidHeader,
        })?;

        let name = line[..colon_pos].trim().to_string();
        let value = line[colon_pos + 1..].trim().to_string();

        headers.push((name, value));
    }

    Ok(headers)
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
