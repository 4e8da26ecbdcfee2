//! Client-side RTSP session (RFC 2326 §A.1).
//!
//! The [`Session`] drives the handshake and then keeps the server-side
//! session alive. It reacts to one input at a time (a paired response, a
//! keepalive tick, a user command, a closed connection) and emits requests
//! through the [`Transport`](crate::transport::Transport). It does no I/O
//! of its own beyond that and never blocks.
//!
//! ## Handshake
//!
//! ```text
//! start           -> OPTIONS *                    AwaitingOptions
//! OPTIONS 200     -> DESCRIBE <url>               AwaitingDescribe
//! DESCRIBE 200    -> SETUP <control url>          AwaitingSetup
//!                    (or Idle: no usable video track)
//! SETUP 200       -> PLAY <url> (Session: id)     AwaitingSetup
//! PLAY 200        ->                              Playing
//! PAUSE 200       ->                              Paused
//! stop / closed   ->                              TornDown
//! ```
//!
//! A 401 is answered once per request with credentials from the newest
//! challenge; a second 401 for the same request ends the session.

pub mod keepalive;
pub mod transport;

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RtspError;
use crate::media::FrameSink;
use crate::protocol::auth::{AuthChallenge, AuthScheme};
use crate::protocol::sdp::{self, TrackNegotiation};
use crate::protocol::{Method, RtspRequest, RtspResponse, RtspUrl};
use crate::transport::Transport;

pub use keepalive::Keepalive;
pub use transport::InterleavedTransport;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingOptions,
    AwaitingDescribe,
    /// SETUP sent, or SETUP done and PLAY sent.
    AwaitingSetup,
    Playing,
    Paused,
    /// Described, but nothing worth setting up.
    Idle,
    TornDown,
}

/// One RTSP session against one server URL.
pub struct Session {
    url: RtspUrl,
    username: String,
    password: String,
    state: SessionState,
    session_id: Option<String>,
    challenge: AuthChallenge,
    supported_methods: HashSet<String>,
    track: Option<TrackNegotiation>,
    parameter_sets_sent: bool,
    keepalive_started: bool,
    in_flight: bool,
    queued: VecDeque<RtspRequest>,
    last_error: Option<RtspError>,
    sdp_dump_path: Option<PathBuf>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn FrameSink>,
}

impl Session {
    /// A session over an already connected transport.
    pub fn new(
        url: RtspUrl,
        username: &str,
        password: &str,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Session {
            url,
            username: username.to_string(),
            password: password.to_string(),
            state: SessionState::Connecting,
            session_id: None,
            challenge: AuthChallenge::default(),
            supported_methods: HashSet::new(),
            track: None,
            parameter_sets_sent: false,
            keepalive_started: false,
            in_flight: false,
            queued: VecDeque::new(),
            last_error: None,
            sdp_dump_path: None,
            transport,
            sink,
        }
    }

    /// Write each DESCRIBE body to `path`.
    pub fn with_sdp_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.sdp_dump_path = path;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url.url
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn track(&self) -> Option<&TrackNegotiation> {
        self.track.as_ref()
    }

    pub fn challenge(&self) -> &AuthChallenge {
        &self.challenge
    }

    /// Methods from the server's `Public` header.
    pub fn supported_methods(&self) -> &HashSet<String> {
        &self.supported_methods
    }

    /// The error that ended or last disturbed the session.
    pub fn last_error(&self) -> Option<&RtspError> {
        self.last_error.as_ref()
    }

    /// Whether the keepalive timer should be running.
    pub fn keepalive_wanted(&self) -> bool {
        self.keepalive_started && self.state != SessionState::TornDown
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!(old_state = ?self.state, new_state = ?state, "state transition");
            self.state = state;
        }
    }

    /// Begin the handshake.
    pub fn start(&mut self) {
        if self.state != SessionState::Connecting {
            return;
        }
        tracing::info!(url = %self.url.url, "starting RTSP session");
        self.set_state(SessionState::AwaitingOptions);
        self.send(RtspRequest::new(Method::Options, "*"));
    }

    /// Handle a response paired with the request it answers.
    pub fn handle_response(&mut self, response: &RtspResponse, request: &RtspRequest) {
        if self.state == SessionState::TornDown {
            tracing::debug!(method = %request.method, "ignoring response after teardown");
            return;
        }
        self.in_flight = false;

        if response.status_code == 401 {
            self.on_unauthorized(response, request);
        } else if !response.is_success() {
            self.on_failure(response, request);
        } else {
            match request.method {
                Method::Options => self.on_options(response),
                Method::Describe => self.on_describe(response, request),
                Method::Setup => self.on_setup(response),
                Method::Play => {
                    tracing::info!(session_id = ?self.session_id, "playing");
                    self.set_state(SessionState::Playing);
                }
                Method::Pause => self.set_state(SessionState::Paused),
                Method::GetParameter => tracing::trace!("keepalive acknowledged"),
                Method::Teardown | Method::Announce => {}
            }
        }

        self.flush_queue();
    }

    fn on_options(&mut self, response: &RtspResponse) {
        self.supported_methods = response.public_methods().into_iter().collect();
        tracing::debug!(methods = ?self.supported_methods, "server capabilities");

        if self.keepalive_started {
            return;
        }
        self.keepalive_started = true;
        self.set_state(SessionState::AwaitingDescribe);
        let describe =
            RtspRequest::new(Method::Describe, &self.url.url).add_header("Accept", "application/sdp");
        self.send(describe);
    }

    fn on_describe(&mut self, response: &RtspResponse, request: &RtspRequest) {
        if let Some(path) = &self.sdp_dump_path
            && let Err(e) = std::fs::write(path, &response.body)
        {
            tracing::warn!(error = %e, path = %path.display(), "failed to write SDP");
        }

        let body = String::from_utf8_lossy(&response.body);
        let negotiation = sdp::negotiate(&body, response.get_header("Content-Base"), &request.uri);

        if let Some(parameter_sets) = &negotiation.parameter_sets
            && !self.parameter_sets_sent
        {
            self.sink.on_parameter_sets(parameter_sets);
            self.parameter_sets_sent = true;
        }

        if self.track.is_none() {
            self.track = negotiation.track;
        }
        let Some(track) = &self.track else {
            tracing::warn!(url = %self.url.url, "no supported video track; nothing to set up");
            self.set_state(SessionState::Idle);
            return;
        };

        let transport = InterleavedTransport::new(track.data_channel, track.control_channel);
        let setup = RtspRequest::new(Method::Setup, &track.control_url)
            .add_header("Transport", &transport.header_value());
        self.set_state(SessionState::AwaitingSetup);
        self.send(setup);
    }

    fn on_setup(&mut self, response: &RtspResponse) {
        self.session_id = response.session_id().map(str::to_string);
        if self.session_id.is_none() {
            tracing::warn!("SETUP reply carries no Session header");
        }

        if let Some(track) = &self.track
            && let Some(granted) = response
                .get_header("Transport")
                .and_then(InterleavedTransport::parse)
            && (granted.data_channel, granted.control_channel)
                != (track.data_channel, track.control_channel)
        {
            tracing::warn!(
                requested = ?(track.data_channel, track.control_channel),
                granted = ?(granted.data_channel, granted.control_channel),
                "server granted different interleaved channels"
            );
        }

        let play = RtspRequest::new(Method::Play, &self.url.url)
            .with_session(self.session_id.as_deref());
        self.send(play);
    }

    fn on_unauthorized(&mut self, response: &RtspResponse, request: &RtspRequest) {
        if request.has_authorization() {
            tracing::warn!(method = %request.method, "credentials rejected");
            self.fail(RtspError::AuthFailure {
                method: request.method,
            });
            return;
        }

        if let Some(header) = response.get_header("WWW-Authenticate") {
            self.challenge = self.challenge.updated(header);
            tracing::debug!(
                scheme = ?self.challenge.scheme,
                realm = %self.challenge.realm,
                "authentication challenge"
            );
        }

        let authorization = self.challenge.authorization(
            &self.username,
            &self.password,
            request.method,
            &self.url.url,
        );
        match authorization {
            Some(value) => {
                tracing::debug!(method = %request.method, "retrying with credentials");
                let mut retry = request.clone();
                retry.set_header("Authorization", &value);
                self.transmit(retry);
            }
            None => {
                tracing::warn!(
                    method = %request.method,
                    "authentication required but no usable credentials"
                );
                self.fail(RtspError::AuthFailure {
                    method: request.method,
                });
            }
        }
    }

    fn on_failure(&mut self, response: &RtspResponse, request: &RtspRequest) {
        let error = RtspError::Protocol {
            method: request.method,
            status: response.status_code,
            reason: response.status_text.clone(),
        };

        let handshake_step = matches!(
            (self.state, request.method),
            (SessionState::AwaitingOptions, Method::Options)
                | (SessionState::AwaitingDescribe, Method::Describe)
                | (SessionState::AwaitingSetup, Method::Setup)
                | (SessionState::AwaitingSetup, Method::Play)
        );
        if handshake_step {
            tracing::warn!(error = %error, "handshake failed");
            self.fail(error);
        } else {
            tracing::warn!(error = %error, "request failed");
            self.last_error = Some(error);
        }
    }

    /// Resume or start delivery. Dropped until SETUP produced a session id.
    pub fn play(&mut self) {
        self.control(Method::Play);
    }

    /// Suspend delivery. Dropped until SETUP produced a session id.
    pub fn pause(&mut self) {
        self.control(Method::Pause);
    }

    fn control(&mut self, method: Method) {
        if self.state == SessionState::TornDown {
            return;
        }
        let Some(id) = self.session_id.clone() else {
            tracing::debug!(%method, "no session yet; ignoring");
            return;
        };
        self.send(RtspRequest::new(method, &self.url.url).with_session(Some(&id)));
    }

    /// Send TEARDOWN if a session exists, then close the connection.
    pub fn stop(&mut self) {
        if self.state == SessionState::TornDown {
            return;
        }
        match self.session_id.clone() {
            Some(id) => {
                let teardown = self.authorize(
                    RtspRequest::new(Method::Teardown, &self.url.url).with_session(Some(&id)),
                );
                if let Err(e) = self.transport.send_message(teardown) {
                    tracing::debug!(error = %e, "TEARDOWN not sent");
                }
            }
            None => tracing::debug!("no session; closing without TEARDOWN"),
        }
        tracing::info!(url = %self.url.url, "session stopped");
        self.shut_down();
    }

    /// Keepalive tick: GET_PARAMETER if the server lists it, else OPTIONS.
    ///
    /// Skipped while another request is outstanding.
    pub fn send_keepalive(&mut self) {
        if !self.keepalive_wanted() {
            return;
        }
        if self.in_flight {
            tracing::debug!("request in flight; skipping keepalive");
            return;
        }
        let method = if self.supported_methods.contains(Method::GetParameter.as_str()) {
            Method::GetParameter
        } else {
            Method::Options
        };
        let request =
            RtspRequest::new(method, &self.url.url).with_session(self.session_id.as_deref());
        self.send(request);
    }

    /// The connection went away underneath the session.
    pub fn transport_closed(&mut self, reason: &str) {
        if self.state == SessionState::TornDown {
            return;
        }
        tracing::info!(reason, "connection closed; tearing down session");
        self.fail(RtspError::TransportClosed);
    }

    /// Attach `Authorization` if a challenge has been seen.
    fn authorize(&self, request: RtspRequest) -> RtspRequest {
        if self.challenge.scheme == AuthScheme::None {
            return request;
        }
        let authorization = self.challenge.authorization(
            &self.username,
            &self.password,
            request.method,
            &self.url.url,
        );
        request.with_authorization(authorization)
    }

    /// Send now, or queue behind the outstanding request.
    ///
    /// Queued requests are authorized when dequeued, so they pick up any
    /// challenge that arrives while they wait.
    fn send(&mut self, request: RtspRequest) {
        if self.in_flight {
            tracing::debug!(method = %request.method, "request queued");
            self.queued.push_back(request);
        } else {
            let request = self.authorize(request);
            self.transmit(request);
        }
    }

    fn transmit(&mut self, request: RtspRequest) {
        match self.transport.send_message(request) {
            Ok(()) => self.in_flight = true,
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                self.fail(e);
            }
        }
    }

    fn flush_queue(&mut self) {
        if self.in_flight || self.state == SessionState::TornDown {
            return;
        }
        if let Some(request) = self.queued.pop_front() {
            let request = self.authorize(request);
            self.transmit(request);
        }
    }

    fn fail(&mut self, error: RtspError) {
        self.last_error = Some(error);
        self.shut_down();
    }

    fn shut_down(&mut self) {
        self.set_state(SessionState::TornDown);
        self.queued.clear();
        self.in_flight = false;
        self.transport.close();
    }
}
