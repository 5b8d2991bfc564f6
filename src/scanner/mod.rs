//! Camera scan loop
//!
//! A [`ScanSession`] acquires a camera through a [`CaptureDevice`], pulls
//! frames from the resulting [`FrameSource`], and hands each one to a
//! [`FrameDecoder`] until a frame yields a recognisable payload or the
//! session is stopped.
//!
//! ```text
//! Idle -> PermissionRequested -> PermissionGranted -> Scanning -> Decoded
//!                            \-> PermissionDenied -> PermissionRequested
//!                            \-> Unavailable               \-> Stopped
//! ```

mod session;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::detector::{DecodeOptions, RasterDecoder};
use crate::models::Frame;
use crate::payload::OpticalPayload;

pub use session::{ScanOptions, ScanSession, StopHandle};

/// Which camera to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Environment-facing
    Rear,
    /// User-facing
    Front,
    /// Whatever the platform offers
    Any,
}

impl Facing {
    /// Acquisition order
    pub const FALLBACK_ORDER: [Facing; 3] = [Facing::Rear, Facing::Front, Facing::Any];
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Facing::Rear => "rear",
            Facing::Front => "front",
            Facing::Any => "any",
        })
    }
}

/// Why a camera could not be opened
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraError {
    /// The user refused access
    #[error("camera permission denied")]
    PermissionDenied,
    /// No camera matches
    #[error("no camera found")]
    DeviceNotFound,
    /// Another application holds the camera
    #[error("camera is in use")]
    DeviceBusy,
    /// The requested facing or resolution is unavailable
    #[error("no camera satisfies the requested constraints")]
    ConstraintsUnsatisfiable,
    /// Access is disabled by policy
    #[error("camera access is blocked")]
    Blocked,
    /// The request was cancelled
    #[error("camera access aborted")]
    Aborted,
    /// Anything else the platform reports
    #[error("unknown camera error")]
    Unknown,
}

impl CameraError {
    /// Whether asking again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CameraError::PermissionDenied
                | CameraError::DeviceBusy
                | CameraError::Aborted
                | CameraError::Unknown
        )
    }

    /// Reasons that override others when every fallback fails
    fn is_user_decision(&self) -> bool {
        matches!(self, CameraError::PermissionDenied | CameraError::Blocked)
    }
}

/// Where a scan session is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Created, nothing requested yet
    Idle,
    /// Waiting for camera access
    PermissionRequested,
    /// A stream is open
    PermissionGranted,
    /// The last request failed; `run` may ask again
    PermissionDenied(CameraError),
    /// Frames are being decoded
    Scanning,
    /// A token payload was read
    Decoded,
    /// Stopped on request
    Stopped,
    /// Gave up on the camera
    Unavailable(CameraError),
}

impl ScanState {
    /// No further transitions happen from here
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Decoded | ScanState::Stopped | ScanState::Unavailable(_)
        )
    }
}

/// How a call to [`ScanSession::run`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// First frame that carried a payload
    Decoded(OpticalPayload),
    /// Ended without a payload in this state
    Finished(ScanState),
}

/// Live frame stream owned by a session
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame at the source's own cadence; `None` when the stream ends
    async fn next_frame(&mut self) -> Option<Frame>;

    /// Stop the stream and free the device. Called at most once per session exit.
    fn release(&mut self);
}

/// Opens camera streams
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Open a stream from the camera facing `facing`
    async fn acquire(&self, facing: Facing) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// Turns a frame into text; a miss is `None`
pub trait FrameDecoder: Send + Sync {
    /// Text of the first symbol found in `frame`
    fn decode(&self, frame: &Frame, options: DecodeOptions) -> Option<String>;
}

impl FrameDecoder for RasterDecoder {
    fn decode(&self, frame: &Frame, options: DecodeOptions) -> Option<String> {
        RasterDecoder::decode(self, frame, options)
    }
}

/// Pick the reason reported when every facing failed
fn fallback_reason(failures: &[CameraError]) -> CameraError {
    failures
        .iter()
        .copied()
        .find(CameraError::is_user_decision)
        .or_else(|| failures.last().copied())
        .unwrap_or(CameraError::Unknown)
}
