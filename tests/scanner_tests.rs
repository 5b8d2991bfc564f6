//! Scan sessions fed with rendered frames through mock cameras

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sealed_qr::{
    CameraError, CaptureDevice, ECLevel, Facing, Frame, FrameSource, OpticalEncoder,
    OpticalPayload, PixelFormat, RasterDecoder, RenderOptions, RowRecord, ScanOptions,
    ScanOutcome, ScanSession, ScanState, SecretKey, TokenCodec, TtlSpec,
};

struct Camera {
    frames: VecDeque<Frame>,
    releases: Arc<AtomicUsize>,
    /// Hang instead of ending when frames run out
    hold_open: bool,
}

#[async_trait]
impl FrameSource for Camera {
    async fn next_frame(&mut self) -> Option<Frame> {
        tokio::time::sleep(Duration::from_millis(33)).await;
        match self.frames.pop_front() {
            Some(frame) => Some(frame),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Only the front camera works
struct FrontOnly {
    frames: Vec<Frame>,
    releases: Arc<AtomicUsize>,
    hold_open: bool,
}

#[async_trait]
impl CaptureDevice for FrontOnly {
    async fn acquire(&self, facing: Facing) -> Result<Box<dyn FrameSource>, CameraError> {
        match facing {
            Facing::Rear => Err(CameraError::DeviceNotFound),
            Facing::Front => Ok(Box::new(Camera {
                frames: self.frames.iter().cloned().collect(),
                releases: self.releases.clone(),
                hold_open: self.hold_open,
            })),
            Facing::Any => unreachable!("front camera should have been used"),
        }
    }
}

fn blank_frame() -> Frame {
    Frame::new(64, 48, PixelFormat::Luma, vec![0xff; 64 * 48])
}

fn noise_frame() -> Frame {
    let data = (0..64 * 48u32)
        .map(|i| if i.wrapping_mul(2_654_435_761).rotate_left(7) % 3 == 0 { 0 } else { 0xff })
        .map(|v| v as u8)
        .collect();
    Frame::new(64, 48, PixelFormat::Luma, data)
}

fn symbol_frame(text: &str, options: &RenderOptions) -> Frame {
    let symbol = OpticalEncoder::default().encode(text, ECLevel::M, 3).unwrap();
    Frame::from(symbol.to_image(options))
}

#[tokio::test(start_paused = true)]
async fn test_scan_decodes_token_after_fallback() {
    let codec = TokenCodec::new(SecretKey::from_bytes([9; 32]));
    let record = RowRecord::new().with("sku", "B-7").with("qty", "3");
    let token = codec.issue(&record, TtlSpec::parse("30m").unwrap()).unwrap();

    let releases = Arc::new(AtomicUsize::new(0));
    let device = FrontOnly {
        frames: vec![
            blank_frame(),
            noise_frame(),
            symbol_frame("not a token", &RenderOptions::default()),
            symbol_frame(&token, &RenderOptions::default()),
        ],
        releases: releases.clone(),
        hold_open: false,
    };

    let mut session = ScanSession::new(device, RasterDecoder::new(), ScanOptions::default());
    let outcome = session.run().await;
    assert_eq!(outcome, ScanOutcome::Decoded(OpticalPayload::Token(token.clone())));
    assert_eq!(session.state(), ScanState::Decoded);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    let ScanOutcome::Decoded(payload) = outcome else { unreachable!() };
    assert_eq!(codec.verify(payload.token()).unwrap().fields(), &record);
}

#[tokio::test(start_paused = true)]
async fn test_scan_reads_light_on_dark_link() {
    let releases = Arc::new(AtomicUsize::new(0));
    let link = "http://localhost:3000/product?id=aGVhZA..aXY.Y3Q.dGFn";
    let inverted = RenderOptions {
        dark: image::Rgb([0xff, 0xff, 0xff]),
        light: image::Rgb([0x10, 0x10, 0x10]),
        ..RenderOptions::default()
    };
    let device = FrontOnly {
        frames: vec![symbol_frame(link, &inverted)],
        releases: releases.clone(),
        hold_open: false,
    };

    let mut session = ScanSession::new(device, RasterDecoder::new(), ScanOptions::default());
    let ScanOutcome::Decoded(payload) = session.run().await else {
        panic!("expected a payload");
    };
    assert_eq!(payload.as_str(), link);
    assert_eq!(payload.token(), "aGVhZA..aXY.Y3Q.dGFn");
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_waiting_for_frames() {
    let releases = Arc::new(AtomicUsize::new(0));
    let device = FrontOnly {
        frames: vec![blank_frame(), noise_frame()],
        releases: releases.clone(),
        hold_open: true,
    };

    let mut session = ScanSession::new(device, RasterDecoder::new(), ScanOptions::default());
    let handle = session.stop_handle();
    let (outcome, ()) = tokio::join!(session.run(), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.stop();
    });

    assert_eq!(outcome, ScanOutcome::Finished(ScanState::Stopped));
    assert_eq!(session.state(), ScanState::Stopped);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    // Stopping again and dropping does not release twice
    session.stop();
    drop(session);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_without_symbol() {
    let releases = Arc::new(AtomicUsize::new(0));
    let device = FrontOnly {
        frames: vec![blank_frame(); 3],
        releases: releases.clone(),
        hold_open: false,
    };

    let mut session = ScanSession::new(device, RasterDecoder::new(), ScanOptions::default());
    assert_eq!(
        session.run().await,
        ScanOutcome::Finished(ScanState::Unavailable(CameraError::Aborted))
    );
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}
