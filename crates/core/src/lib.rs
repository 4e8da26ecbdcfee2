pub mod client;
pub mod error;
pub mod media;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use client::{ClientConfig, RtspClient};
pub use error::{Result, RtspError};
pub use media::{FrameSink, ParameterSets};
pub use session::SessionState;
