//! Batch export over a realistic sheet

use std::time::Duration;

use assert_matches::assert_matches;
use sealed_qr::{
    BatchOptions, BatchOrchestrator, DecodeOptions, ECLevel, EncodeError, Frame, ItemError,
    MemorySink, OpticalEncoder, OpticalPayload, RasterDecoder, RowRecord, SecretKey, TokenCodec,
};
use tokio::time::Instant;

fn sheet(rows: usize) -> Vec<RowRecord> {
    (0..rows)
        .map(|i| {
            RowRecord::new()
                .with("id", i.to_string())
                .with("product", format!("Product {i}"))
                .with("lot", format!("L-{:04}", i * 7))
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_hundred_rows_with_one_oversized() {
    let codec = TokenCodec::new(SecretKey::from_bytes([3; 32]));
    let sink = MemorySink::new();
    let options = BatchOptions {
        scale: 2,
        ..BatchOptions::default()
    };
    let batch = BatchOrchestrator::new(&codec, OpticalEncoder::default(), &sink, options);

    let mut rows = sheet(100);
    rows[41].insert("description", "x".repeat(1500));

    let start = Instant::now();
    let result = batch.run(&rows, "7d", ECLevel::H).await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(300 * 99));

    assert_eq!(result.succeeded, 99);
    assert_eq!(result.failed, 1);
    assert_eq!(result.failures.len(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.index, 41);
    assert_eq!(failure.name, "qr-row-43.png");
    assert_matches!(
        failure.error,
        ItemError::Encode(EncodeError::PayloadTooLarge { ec_level: ECLevel::H, capacity: 1273, .. })
    );

    let artifacts = sink.take();
    assert_eq!(artifacts.len(), 99);
    assert_eq!(artifacts[0].name, "qr-row-2.png");
    assert_eq!(artifacts[98].name, "qr-row-101.png");
    assert!(artifacts.windows(2).all(|w| w[0].index < w[1].index));

    // Spot check: an exported artifact scans back to its row
    let frame = Frame::from(image::load_from_memory(&artifacts[10].bytes).unwrap().to_rgb8());
    let text = RasterDecoder::new().decode(&frame, DecodeOptions::default()).unwrap();
    let payload = OpticalPayload::parse(&text).unwrap();
    let claims = codec.verify(payload.token()).unwrap();
    assert_eq!(claims.fields(), &rows[10]);
}
