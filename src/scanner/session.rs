use tokio_util::sync::CancellationToken;

use super::{
    CameraError, CaptureDevice, Facing, FrameDecoder, FrameSource, ScanOutcome, ScanState,
    fallback_reason,
};
use crate::detector::DecodeOptions;
use crate::payload::OpticalPayload;

/// Default number of failed permission requests before giving up
pub const DEFAULT_MAX_PERMISSION_REQUESTS: u32 = 3;

/// Session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Also look for light-on-dark symbols
    pub try_inverted: bool,
    /// Failed permission rounds before `Unavailable`
    pub max_permission_requests: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            try_inverted: true,
            max_permission_requests: DEFAULT_MAX_PERMISSION_REQUESTS,
        }
    }
}

/// Stops a session from another task
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
}

impl StopHandle {
    /// Idempotent; the session releases its stream at its next await point
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// One scan attempt: camera acquisition plus the frame loop
pub struct ScanSession<D, F> {
    device: D,
    decoder: F,
    options: ScanOptions,
    state: ScanState,
    stream: Option<Box<dyn FrameSource>>,
    cancel: CancellationToken,
    failed_requests: u32,
}

impl<D: CaptureDevice, F: FrameDecoder> ScanSession<D, F> {
    /// Idle session; nothing is requested until `run`
    pub fn new(device: D, decoder: F, options: ScanOptions) -> Self {
        Self {
            device,
            decoder,
            options,
            state: ScanState::Idle,
            stream: None,
            cancel: CancellationToken::new(),
            failed_requests: 0,
        }
    }

    /// Current state; a pending stop request reads as `Stopped`
    pub fn state(&self) -> ScanState {
        if self.cancel.is_cancelled() && !self.state.is_terminal() {
            ScanState::Stopped
        } else {
            self.state
        }
    }

    /// Handle for stopping this session from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Stop now: release the stream and end the session. Idempotent.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.halt();
    }

    /// Ask for a camera, trying each facing in fallback order
    pub async fn request_permission(&mut self) -> ScanState {
        self.observe_stop();
        match self.state {
            ScanState::Idle | ScanState::PermissionDenied(_) => {}
            state => return state,
        }

        self.transition(ScanState::PermissionRequested);
        let mut failures = Vec::with_capacity(Facing::FALLBACK_ORDER.len());
        for facing in Facing::FALLBACK_ORDER {
            let attempt = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.device.acquire(facing) => Some(result),
            };
            match attempt {
                None => {
                    self.halt();
                    return self.state;
                }
                Some(Ok(stream)) => {
                    tracing::debug!(%facing, "camera acquired");
                    self.stream = Some(stream);
                    self.failed_requests = 0;
                    self.transition(ScanState::PermissionGranted);
                    return self.state;
                }
                Some(Err(error)) => {
                    tracing::debug!(%facing, %error, "camera acquisition failed");
                    failures.push(error);
                }
            }
        }

        self.failed_requests += 1;
        let reason = fallback_reason(&failures);
        let next = if reason.is_retryable() && self.failed_requests < self.options.max_permission_requests {
            ScanState::PermissionDenied(reason)
        } else {
            ScanState::Unavailable(reason)
        };
        self.transition(next);
        self.state
    }

    /// Scan until a frame yields a payload, the stream ends, or the session is stopped
    pub async fn run(&mut self) -> ScanOutcome {
        self.observe_stop();
        if self.state.is_terminal() {
            return ScanOutcome::Finished(self.state);
        }

        if self.stream.is_none() {
            let state = self.request_permission().await;
            if state != ScanState::PermissionGranted {
                return ScanOutcome::Finished(state);
            }
        }
        self.transition(ScanState::Scanning);

        let decode_options = DecodeOptions {
            try_inverted: self.options.try_inverted,
        };
        loop {
            if self.cancel.is_cancelled() {
                self.halt();
                return ScanOutcome::Finished(self.state);
            }
            let Some(stream) = self.stream.as_mut() else {
                self.transition(ScanState::Unavailable(CameraError::Aborted));
                return ScanOutcome::Finished(self.state);
            };

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                frame = stream.next_frame() => Some(frame),
            };
            let Some(frame) = next else {
                self.halt();
                return ScanOutcome::Finished(self.state);
            };

            let Some(frame) = frame else {
                tracing::info!("camera stream ended");
                self.release();
                self.transition(ScanState::Unavailable(CameraError::Aborted));
                return ScanOutcome::Finished(self.state);
            };

            let payload = match self.decoder.decode(&frame, decode_options) {
                Some(text) => {
                    let payload = OpticalPayload::parse(&text);
                    if payload.is_none() {
                        tracing::debug!(len = text.len(), "decoded text is not a token payload");
                    }
                    payload
                }
                None => {
                    tracing::trace!("no symbol in frame");
                    None
                }
            };
            if let Some(payload) = payload {
                self.release();
                self.transition(ScanState::Decoded);
                return ScanOutcome::Decoded(payload);
            }
            // Ready sources never park the task; let a stop request run
            tokio::task::yield_now().await;
        }
    }

    fn observe_stop(&mut self) {
        if self.cancel.is_cancelled() {
            self.halt();
        }
    }

    /// Release and move non-terminal states to `Stopped`
    fn halt(&mut self) {
        self.release();
        if !self.state.is_terminal() {
            self.transition(ScanState::Stopped);
        }
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            tracing::debug!("camera released");
        }
    }

    fn transition(&mut self, next: ScanState) {
        if self.state != next {
            tracing::info!(from = ?self.state, to = ?next, "scan session state");
            self.state = next;
        }
    }
}

impl<D, F> Drop for ScanSession<D, F> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frame, PixelFormat};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TOKEN: &str = "eyJhbGciOiJkaXIifQ..aXY.Y3Q.dGFn";

    /// Frames carry their "decoded" text in the pixel buffer
    fn frame(text: &str) -> Frame {
        Frame::new(text.len(), 1, PixelFormat::Luma, text.as_bytes().to_vec())
    }

    struct TextDecoder;

    impl FrameDecoder for TextDecoder {
        fn decode(&self, frame: &Frame, _options: DecodeOptions) -> Option<String> {
            let text = String::from_utf8(frame.data.clone()).ok()?;
            (!text.is_empty()).then_some(text)
        }
    }

    struct ScriptedStream {
        frames: VecDeque<Frame>,
        releases: Arc<AtomicUsize>,
        hang_when_empty: bool,
    }

    #[async_trait]
    impl FrameSource for ScriptedStream {
        async fn next_frame(&mut self) -> Option<Frame> {
            match self.frames.pop_front() {
                Some(frame) => Some(frame),
                None if self.hang_when_empty => std::future::pending().await,
                None => None,
            }
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedDevice {
        outcomes: Mutex<VecDeque<Result<(), CameraError>>>,
        frames: Vec<Frame>,
        hang_when_empty: bool,
        attempts: Mutex<Vec<Facing>>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedDevice {
        fn new(outcomes: Vec<Result<(), CameraError>>, frames: Vec<Frame>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                frames,
                hang_when_empty: false,
                attempts: Mutex::new(Vec::new()),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CaptureDevice for &ScriptedDevice {
        async fn acquire(&self, facing: Facing) -> Result<Box<dyn FrameSource>, CameraError> {
            self.attempts.lock().unwrap().push(facing);
            let outcome = self.outcomes.lock().unwrap().pop_front().unwrap_or(Err(CameraError::Unknown));
            outcome.map(|()| {
                Box::new(ScriptedStream {
                    frames: self.frames.clone().into(),
                    releases: self.releases.clone(),
                    hang_when_empty: self.hang_when_empty,
                }) as Box<dyn FrameSource>
            })
        }
    }

    #[tokio::test]
    async fn test_decodes_first_payload_and_releases() {
        let device = ScriptedDevice::new(
            vec![Ok(())],
            vec![frame(""), frame("hello world"), frame(TOKEN), frame(TOKEN)],
        );
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());
        assert_eq!(session.state(), ScanState::Idle);

        let outcome = session.run().await;
        assert_eq!(outcome, ScanOutcome::Decoded(OpticalPayload::Token(TOKEN.into())));
        assert_eq!(session.state(), ScanState::Decoded);
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);

        // Terminal: no second payload
        assert_eq!(session.run().await, ScanOutcome::Finished(ScanState::Decoded));
        drop(session);
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_order() {
        let device = ScriptedDevice::new(
            vec![Err(CameraError::DeviceNotFound), Err(CameraError::ConstraintsUnsatisfiable), Ok(())],
            vec![frame(TOKEN)],
        );
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());
        assert_eq!(session.request_permission().await, ScanState::PermissionGranted);
        assert_eq!(
            *device.attempts.lock().unwrap(),
            vec![Facing::Rear, Facing::Front, Facing::Any]
        );
        assert!(matches!(session.run().await, ScanOutcome::Decoded(_)));
    }

    #[tokio::test]
    async fn test_denied_then_unavailable_after_limit() {
        let denied = Err(CameraError::PermissionDenied);
        let device = ScriptedDevice::new(vec![denied; 9], vec![]);
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());

        let denied_state = ScanState::PermissionDenied(CameraError::PermissionDenied);
        assert_eq!(session.run().await, ScanOutcome::Finished(denied_state));
        assert_eq!(session.request_permission().await, denied_state);
        assert_eq!(
            session.request_permission().await,
            ScanState::Unavailable(CameraError::PermissionDenied)
        );
        assert_eq!(device.attempts.lock().unwrap().len(), 9);
        let outcome = session.run().await;
        assert_eq!(outcome, ScanOutcome::Finished(session.state()));
    }

    #[tokio::test]
    async fn test_non_retryable_reason_is_unavailable() {
        let device = ScriptedDevice::new(
            vec![Err(CameraError::Blocked), Err(CameraError::DeviceBusy), Err(CameraError::DeviceNotFound)],
            vec![],
        );
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());
        assert_eq!(
            session.request_permission().await,
            ScanState::Unavailable(CameraError::Blocked)
        );
    }

    #[tokio::test]
    async fn test_stream_end_is_unavailable() {
        let device = ScriptedDevice::new(vec![Ok(())], vec![frame("noise")]);
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());
        assert_eq!(
            session.run().await,
            ScanOutcome::Finished(ScanState::Unavailable(CameraError::Aborted))
        );
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_handle_interrupts_waiting_run() {
        let mut device = ScriptedDevice::new(vec![Ok(())], vec![frame("noise")]);
        device.hang_when_empty = true;
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());
        let handle = session.stop_handle();

        let stopper = async {
            tokio::task::yield_now().await;
            handle.stop();
            handle.stop();
        };
        let (outcome, ()) = tokio::join!(session.run(), stopper);
        assert_eq!(outcome, ScanOutcome::Finished(ScanState::Stopped));
        assert_eq!(session.state(), ScanState::Stopped);
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);

        session.stop();
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);
    }

    /// Always has a frame ready: alternates undecodable and non-payload frames
    struct EndlessStream {
        served: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FrameSource for EndlessStream {
        async fn next_frame(&mut self) -> Option<Frame> {
            let n = self.served.fetch_add(1, Ordering::SeqCst);
            Some(if n % 2 == 0 { frame("") } else { frame("noise") })
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct EndlessDevice {
        served: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CaptureDevice for EndlessDevice {
        async fn acquire(&self, _facing: Facing) -> Result<Box<dyn FrameSource>, CameraError> {
            Ok(Box::new(EndlessStream {
                served: self.served.clone(),
                releases: self.releases.clone(),
            }))
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_stop_from_other_task_with_ready_frames() {
        let served = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let device = EndlessDevice {
            served: served.clone(),
            releases: releases.clone(),
        };
        let mut session = ScanSession::new(device, TextDecoder, ScanOptions::default());
        let handle = session.stop_handle();

        let stopper = tokio::spawn({
            let served = served.clone();
            async move {
                for _ in 0..3 {
                    tokio::task::yield_now().await;
                }
                let at_stop = served.load(Ordering::SeqCst);
                handle.stop();
                at_stop
            }
        });

        assert_eq!(session.run().await, ScanOutcome::Finished(ScanState::Stopped));
        let at_stop = stopper.await.unwrap();
        assert!(at_stop > 0);
        // At most the frame already in flight is sampled after the stop
        assert!(served.load(Ordering::SeqCst) <= at_stop + 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let device = ScriptedDevice::new(vec![Ok(())], vec![frame(TOKEN)]);
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());
        session.stop_handle().stop();
        assert_eq!(session.state(), ScanState::Stopped);
        assert_eq!(session.run().await, ScanOutcome::Finished(ScanState::Stopped));
        assert!(device.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_releases_granted_stream() {
        let device = ScriptedDevice::new(vec![Ok(())], vec![]);
        let mut session = ScanSession::new(&device, TextDecoder, ScanOptions::default());
        session.request_permission().await;
        assert_eq!(device.releases.load(Ordering::SeqCst), 0);
        drop(session);
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);
    }
}
