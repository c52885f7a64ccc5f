//! Destination for child stderr streams.
//!
//! Children inherit the gateway's stderr only when verbose logging is
//! requested. Otherwise their stderr goes to a single handle on the null
//! device that is opened at startup and closed when the gateway releases
//! the sink during shutdown.

use std::fs::{File, OpenOptions};
use std::process::Stdio;

use tracing::debug;

use crate::Result;

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Where launched children write their stderr.
#[derive(Debug)]
pub enum ErrorSink {
    /// Forward to the gateway's own stderr.
    Inherit,
    /// Discard into the shared null-device handle.
    Discard(File),
}

impl ErrorSink {
    /// Acquire the sink for the gateway's lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the null device cannot be opened.
    pub fn open(forward: bool) -> Result<Self> {
        if forward {
            return Ok(Self::Inherit);
        }
        let handle = OpenOptions::new().write(true).open(NULL_DEVICE)?;
        debug!(device = NULL_DEVICE, "opened discarded-output sink");
        Ok(Self::Discard(handle))
    }

    /// Stdio handle to give to one child process.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the shared handle cannot be duplicated.
    pub fn stdio(&self) -> Result<Stdio> {
        match self {
            Self::Inherit => Ok(Stdio::inherit()),
            Self::Discard(handle) => Ok(Stdio::from(handle.try_clone()?)),
        }
    }

    /// Whether child stderr is forwarded.
    #[must_use]
    pub fn is_forwarding(&self) -> bool {
        matches!(self, Self::Inherit)
    }
}

impl Drop for ErrorSink {
    fn drop(&mut self) {
        if let Self::Discard(_) = self {
            debug!("closing discarded-output sink");
        }
    }
}
