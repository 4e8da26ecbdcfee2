//! In-memory transport and sink for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, RtspError};
use crate::media::{FrameSink, ParameterSets};
use crate::protocol::RtspRequest;
use crate::transport::Transport;

/// Records everything sent through it instead of writing to a socket.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<RtspRequest>>,
    raw: Mutex<Vec<(u8, Vec<u8>)>>,
    closed: AtomicBool,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn requests(&self) -> Vec<RtspRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request; panics if nothing was sent.
    pub fn last_request(&self) -> RtspRequest {
        self.requests.lock().last().cloned().expect("no request sent")
    }

    pub fn raw(&self) -> Vec<(u8, Vec<u8>)> {
        self.raw.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make every later send fail.
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl Transport for RecordingTransport {
    fn send_message(&self, request: RtspRequest) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RtspError::TransportClosed);
        }
        self.requests.lock().push(request);
        Ok(())
    }

    fn send_raw(&self, channel: u8, payload: &[u8]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RtspError::TransportClosed);
        }
        self.raw.lock().push((channel, payload.to_vec()));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// Collects sink calls.
#[derive(Default)]
pub struct RecordingSink {
    parameter_sets: Mutex<Vec<ParameterSets>>,
    frames: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    pub fn parameter_sets(&self) -> Vec<ParameterSets> {
        self.parameter_sets.lock().clone()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }
}

impl FrameSink for RecordingSink {
    fn on_parameter_sets(&self, parameter_sets: &ParameterSets) {
        self.parameter_sets.lock().push(parameter_sets.clone());
    }

    fn on_frame_data(&self, payload: &[u8]) {
        self.frames.lock().push(payload.to_vec());
    }
}
