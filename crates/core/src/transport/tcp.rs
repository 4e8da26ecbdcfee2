use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ParseErrorKind, Result, RtspError};
use crate::protocol::request::{find_header, parse_header_lines};
use crate::protocol::{RtspRequest, RtspResponse};

use super::{Transport, TransportEvent};

/// Largest message body accepted from the server.
pub const MAX_BODY_LEN: usize = 1024 * 1024;

/// Requests sent but not yet answered, keyed by `CSeq`.
type Pending = Arc<Mutex<HashMap<u32, RtspRequest>>>;

enum Outbound {
    Bytes(Vec<u8>),
    /// Flush what was queued before, then shut the socket down.
    Shutdown,
}

/// Interleaved RTSP transport over one TCP connection.
///
/// A writer task drains an outbound queue so that sends never block the
/// session; a reader task splits the inbound byte stream into responses and
/// `$`-framed chunks and forwards them as [`TransportEvent`]s.
pub struct TcpTransport {
    peer: String,
    user_agent: String,
    next_cseq: AtomicU32,
    pending: Pending,
    outbound: mpsc::UnboundedSender<Outbound>,
    connected: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl TcpTransport {
    /// Connect to `host:port`, giving up after `timeout`.
    ///
    /// Returns the transport and the stream of events it will produce.
    /// Must be called from within a tokio runtime.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>)> {
        let peer = format!("{host}:{port}");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&peer)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RtspError::ConnectFailure {
                    addr: peer,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(RtspError::ConnectFailure {
                    addr: peer,
                    reason: format!("timed out after {} ms", timeout.as_millis()),
                });
            }
        };
        stream.set_nodelay(true)?;

        tracing::info!(%peer, "connected to RTSP server");

        let (read_half, write_half) = stream.into_split();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(write_loop(
            write_half,
            outbound_rx,
            connected.clone(),
            events_tx.clone(),
        ));
        let reader = tokio::spawn(read_loop(
            BufReader::new(read_half),
            pending.clone(),
            connected.clone(),
            events_tx,
        ));

        let transport = Arc::new(TcpTransport {
            peer,
            user_agent: user_agent.to_string(),
            next_cseq: AtomicU32::new(1),
            pending,
            outbound: outbound_tx,
            connected,
            reader: Mutex::new(Some(reader)),
        });

        Ok((transport, events_rx))
    }

    fn queue(&self, outbound: Outbound) -> Result<()> {
        if !self.is_connected() {
            return Err(RtspError::TransportClosed);
        }
        self.outbound
            .send(outbound)
            .map_err(|_| RtspError::TransportClosed)
    }
}

impl Transport for TcpTransport {
    fn send_message(&self, request: RtspRequest) -> Result<()> {
        let cseq = self.next_cseq.fetch_add(1, Ordering::SeqCst);
        let wire = request
            .clone()
            .add_header("User-Agent", &self.user_agent)
            .serialize(cseq);

        tracing::debug!(
            peer = %self.peer,
            cseq,
            method = %request.method,
            uri = %request.uri,
            "request"
        );

        self.pending.lock().insert(cseq, request);
        let sent = self.queue(Outbound::Bytes(wire.into_bytes()));
        if sent.is_err() {
            self.pending.lock().remove(&cseq);
        }
        sent
    }

    fn send_raw(&self, channel: u8, payload: &[u8]) -> Result<()> {
        let len = u16::try_from(payload.len()).map_err(|_| RtspError::MalformedPacket {
            reason: "interleaved chunk longer than 65535 bytes",
        })?;
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.push(b'$');
        frame.push(channel);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(payload);
        self.queue(Outbound::Bytes(frame))
    }

    fn close(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!(peer = %self.peer, "closing RTSP connection");
        let _ = self.outbound.send(Outbound::Shutdown);
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        self.pending.lock().clear();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.get_mut().take() {
            reader.abort();
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    connected: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Bytes(bytes) => {
                if let Err(e) = writer.write_all(&bytes).await {
                    tracing::warn!(error = %e, "write to RTSP server failed");
                    connected.store(false, Ordering::SeqCst);
                    let _ = events.send(TransportEvent::Closed {
                        reason: format!("write error: {e}"),
                    });
                    return;
                }
            }
            Outbound::Shutdown => break,
        }
    }
    let _ = writer.shutdown().await;
    tracing::debug!("writer exited");
}

async fn read_loop(
    mut reader: BufReader<OwnedReadHalf>,
    pending: Pending,
    connected: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let reason = match read_messages(&mut reader, &pending, &events).await {
        Ok(()) => "connection closed by server".to_string(),
        Err(e) => format!("read error: {e}"),
    };
    connected.store(false, Ordering::SeqCst);
    tracing::info!(%reason, "RTSP connection lost");
    let _ = events.send(TransportEvent::Closed { reason });
}

/// Read messages until EOF or until nobody is listening.
async fn read_messages(
    reader: &mut BufReader<OwnedReadHalf>,
    pending: &Pending,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<()> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }

        let event = if buf[0] == b'$' {
            let mut header = [0u8; 4];
            reader.read_exact(&mut header).await?;
            let len = usize::from(u16::from_be_bytes([header[2], header[3]]));
            let mut payload = vec![0u8; len];
            reader.read_exact(&mut payload).await?;
            TransportEvent::Data {
                channel: header[1],
                payload,
            }
        } else {
            let head = read_head(reader).await?;
            if head.is_empty() {
                continue;
            }
            match read_response(reader, &head, pending).await? {
                Some(event) => event,
                None => continue,
            }
        };

        if events.send(event).is_err() {
            return Ok(());
        }
    }
}

/// Read a start line and headers, up to and excluding the blank line.
///
/// Returns an empty string for a stray blank line between messages.
async fn read_head(reader: &mut BufReader<OwnedReadHalf>) -> Result<String> {
    let mut head = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        if line == "\r\n" || line == "\n" {
            return Ok(head);
        }
        head.push_str(&line);
    }
}

fn checked_body_len(len: usize) -> Result<usize> {
    if len > MAX_BODY_LEN {
        tracing::warn!(len, max = MAX_BODY_LEN, "declared body too large");
        return Err(RtspError::Parse {
            kind: ParseErrorKind::InvalidContentLength,
        });
    }
    Ok(len)
}

/// Finish reading a message whose head is `head`, pairing responses with
/// their requests. Requests sent by the server are read and skipped.
async fn read_response(
    reader: &mut BufReader<OwnedReadHalf>,
    head: &str,
    pending: &Pending,
) -> Result<Option<TransportEvent>> {
    if !head.starts_with("RTSP/") {
        let mut lines = head.lines();
        let start_line = lines.next().unwrap_or("");
        let headers = parse_header_lines(lines)?;
        let len = find_header(&headers, "Content-Length")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let mut discard = vec![0u8; checked_body_len(len)?];
        reader.read_exact(&mut discard).await?;
        tracing::warn!(start_line, "ignoring request from server");
        return Ok(None);
    }

    let response = RtspResponse::parse(head)?;
    let mut body = vec![0u8; checked_body_len(response.content_length()?)?];
    reader.read_exact(&mut body).await?;
    let response = response.with_body(body);

    tracing::debug!(
        status = response.status_code,
        cseq = ?response.cseq(),
        body_len = response.body.len(),
        "response"
    );

    let request = response.cseq().and_then(|cseq| pending.lock().remove(&cseq));
    match request {
        Some(request) => Ok(Some(TransportEvent::Message { response, request })),
        None => {
            tracing::warn!(cseq = ?response.cseq(), "response matches no outstanding request");
            Ok(None)
        }
    }
}
