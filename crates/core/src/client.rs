//! The public client: connect, then control the session from any thread.
//!
//! All session state lives in one task, which owns the [`Session`], the
//! [`Interpreter`] and the keepalive timer, and serializes transport events,
//! keepalive ticks and user commands through a single `select!` loop. The
//! [`RtspClient`] handle only sends commands and observes state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::media::FrameSink;
use crate::media::interpreter::Interpreter;
use crate::protocol::RtspUrl;
use crate::protocol::request::USER_AGENT;
use crate::session::keepalive::DEFAULT_KEEPALIVE_INTERVAL;
use crate::session::{Keepalive, Session, SessionState};
use crate::transport::{TcpTransport, Transport, TransportEvent};

/// Default limit on establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
    /// Sent as `User-Agent` on every request.
    pub user_agent: String,
    /// SSRC for outgoing receiver reports; random when `None`.
    pub ssrc: Option<u32>,
    /// If set, each DESCRIBE body is written here.
    pub sdp_dump_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            user_agent: USER_AGENT.to_string(),
            ssrc: None,
            sdp_dump_path: None,
        }
    }
}

#[derive(Debug)]
enum Command {
    Play,
    Pause,
    Stop,
}

/// Handle to a running RTSP session.
///
/// Dropping the handle stops the session as if [`stop`](Self::stop) had
/// been called.
pub struct RtspClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    transport: Arc<dyn Transport>,
}

impl RtspClient {
    /// Connect to `url` and start the handshake.
    ///
    /// Credentials given here take precedence over any `user:password@` in
    /// the URL. Must be called from within a tokio runtime.
    pub async fn connect(
        url: &str,
        username: Option<&str>,
        password: Option<&str>,
        sink: Arc<dyn FrameSink>,
        config: ClientConfig,
    ) -> Result<Self> {
        let url = RtspUrl::parse(url)?;
        let username = username
            .map(str::to_string)
            .or_else(|| url.username.clone())
            .unwrap_or_default();
        let password = password
            .map(str::to_string)
            .or_else(|| url.password.clone())
            .unwrap_or_default();

        let (transport, events) = TcpTransport::connect(
            &url.host,
            url.port,
            config.connect_timeout,
            &config.user_agent,
        )
        .await?;

        Ok(Self::start(
            url, &username, &password, transport, events, sink, config,
        ))
    }

    /// Start a session over an already connected transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        url: RtspUrl,
        username: &str,
        password: &str,
        transport: Arc<dyn Transport>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        sink: Arc<dyn FrameSink>,
        config: ClientConfig,
    ) -> Self {
        let ssrc = config.ssrc.unwrap_or_else(rand::random);
        let session = Session::new(url, username, password, transport.clone(), sink.clone())
            .with_sdp_dump_path(config.sdp_dump_path);
        let interpreter = Interpreter::new(ssrc, transport.clone(), sink);
        let keepalive = Keepalive::new(config.keepalive_interval);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(session.state());

        tokio::spawn(run(
            session,
            interpreter,
            keepalive,
            commands_rx,
            events,
            state_tx,
        ));

        RtspClient {
            commands: commands_tx,
            state: state_rx,
            transport,
        }
    }

    /// Resume delivery. Ignored until SETUP has produced a session.
    pub fn play(&self) {
        self.command(Command::Play);
    }

    /// Suspend delivery. Ignored until SETUP has produced a session.
    pub fn pause(&self) {
        self.command(Command::Pause);
    }

    /// Send TEARDOWN (if a session exists) and close the connection.
    pub fn stop(&self) {
        self.command(Command::Stop);
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("session task already finished");
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// True once the connection is gone or the session was torn down.
    pub fn is_streaming_finished(&self) -> bool {
        !self.transport.is_connected() || self.state() == SessionState::TornDown
    }
}

async fn run(
    mut session: Session,
    mut interpreter: Interpreter,
    mut keepalive: Keepalive,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    state: watch::Sender<SessionState>,
) {
    session.start();
    state.send_replace(session.state());

    while session.state() != SessionState::TornDown {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Play) => session.play(),
                Some(Command::Pause) => session.pause(),
                Some(Command::Stop) | None => session.stop(),
            },
            event = events.recv() => match event {
                Some(TransportEvent::Message { response, request }) => {
                    session.handle_response(&response, &request);
                }
                Some(TransportEvent::Data { channel, payload }) => {
                    interpreter.handle_chunk(session.track(), channel, &payload);
                }
                Some(TransportEvent::Closed { reason }) => session.transport_closed(&reason),
                None => session.transport_closed("transport dropped its event stream"),
            },
            () = keepalive.tick() => session.send_keepalive(),
        }

        if session.keepalive_wanted() {
            keepalive.start();
        } else {
            keepalive.stop();
        }
        state.send_replace(session.state());
    }

    tracing::info!(
        url = session.url(),
        ssrc = format_args!("{:#010X}", interpreter.ssrc()),
        stats = ?interpreter.stats(),
        "session task finished"
    );
}
