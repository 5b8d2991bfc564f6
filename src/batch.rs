//! Paced bulk export: one symbol per record, delivered to a sink
//!
//! Items run in input order. A failing item is recorded and the batch moves
//! on; only an empty input or an unparseable TTL stops the whole run.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::encoder::{EncodeError, OpticalEncoder, RenderError};
use crate::models::{ECLevel, RowRecord};
use crate::payload::PayloadFormat;
use crate::token::{TokenCodec, TokenError, TtlSpec};

/// Default delay between successive items
pub const DEFAULT_PACING: Duration = Duration::from_millis(300);
/// Default pixels per module for exported symbols
pub const DEFAULT_EXPORT_SCALE: u32 = 8;

/// Reasons a whole batch cannot start
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The input had no rows
    #[error("no records to export")]
    NoRecords,
    /// The configured token lifetime does not parse
    #[error("invalid token lifetime {0:?}")]
    InvalidDuration(String),
}

/// Failure reported by an [`ArtifactSink`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("delivery failed: {message}")]
pub struct DeliveryError {
    /// What went wrong, as reported by the sink
    pub message: String,
}

impl DeliveryError {
    /// Wrap any message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a single item was skipped
#[derive(Debug, Error)]
pub enum ItemError {
    /// Issuing the token failed
    #[error(transparent)]
    Token(#[from] TokenError),
    /// The payload does not fit in a symbol
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Drawing or encoding the image failed
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The sink rejected the artifact
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// An item that was skipped, and why
#[derive(Debug)]
pub struct ItemFailure {
    /// Zero-based position in the input
    pub index: usize,
    /// Artifact name the item would have had
    pub name: String,
    /// Cause of the skip
    pub error: ItemError,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Items delivered
    pub succeeded: usize,
    /// Items skipped
    pub failed: usize,
    /// Skipped items in input order
    pub failures: Vec<ItemFailure>,
    /// Names of delivered artifacts, in order
    pub delivered: Vec<String>,
}

/// Output encoding of each artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactFormat {
    /// Raster image
    #[default]
    Png,
    /// Vector path markup
    Svg,
}

impl ArtifactFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Svg => "svg",
        }
    }

    /// MIME type of the encoded bytes
    pub fn media_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "image/png",
            ArtifactFormat::Svg => "image/svg+xml",
        }
    }
}

/// One rendered symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Zero-based position in the input
    pub index: usize,
    /// File name, see [`artifact_name`]
    pub name: String,
    /// MIME type of `bytes`
    pub media_type: &'static str,
    /// Encoded image
    pub bytes: Vec<u8>,
}

/// `qr-row-{n}.{ext}` where row 1 is the spreadsheet header
pub fn artifact_name(index: usize, format: ArtifactFormat) -> String {
    format!("qr-row-{}.{}", index + 2, format.extension())
}

/// Receives finished artifacts (download, archive, upload...)
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Hand over one artifact; an error skips the item and the batch goes on
    async fn deliver(&self, artifact: Artifact) -> Result<(), DeliveryError>;
}

/// Sink that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything delivered so far
    pub fn take(&self) -> Vec<Artifact> {
        match self.artifacts.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn deliver(&self, artifact: Artifact) -> Result<(), DeliveryError> {
        self.artifacts
            .lock()
            .map_err(|_| DeliveryError::new("memory sink poisoned"))?
            .push(artifact);
        Ok(())
    }
}

#[async_trait]
impl<S: ArtifactSink + ?Sized> ArtifactSink for &S {
    async fn deliver(&self, artifact: Artifact) -> Result<(), DeliveryError> {
        (**self).deliver(artifact).await
    }
}

/// Per-batch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Pause between items; none after the last
    pub pacing: Duration,
    /// Pixels per module
    pub scale: u32,
    /// Image encoding
    pub format: ArtifactFormat,
    /// Bare token or link
    pub payload: PayloadFormat,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            scale: DEFAULT_EXPORT_SCALE,
            format: ArtifactFormat::Png,
            payload: PayloadFormat::Token,
        }
    }
}

/// Turns rows into delivered artifacts, one at a time
pub struct BatchOrchestrator<'a, S> {
    codec: &'a TokenCodec,
    encoder: OpticalEncoder,
    sink: S,
    options: BatchOptions,
}

impl<'a, S: ArtifactSink> BatchOrchestrator<'a, S> {
    /// Orchestrator delivering into `sink`
    pub fn new(codec: &'a TokenCodec, encoder: OpticalEncoder, sink: S, options: BatchOptions) -> Self {
        Self {
            codec,
            encoder,
            sink,
            options,
        }
    }

    /// The sink artifacts go to
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Issue, encode, render and deliver every record in order
    pub async fn run(
        &self,
        records: &[RowRecord],
        ttl: &str,
        ec_level: ECLevel,
    ) -> Result<BatchResult, BatchError> {
        if records.is_empty() {
            return Err(BatchError::NoRecords);
        }
        let ttl = TtlSpec::parse(ttl).map_err(|_| BatchError::InvalidDuration(ttl.to_string()))?;

        tracing::info!(records = records.len(), %ttl, %ec_level, "batch export started");

        let mut result = BatchResult::default();
        for (index, record) in records.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.options.pacing).await;
            }

            let name = artifact_name(index, self.options.format);
            match self.process(index, &name, record, ttl, ec_level).await {
                Ok(()) => {
                    result.succeeded += 1;
                    result.delivered.push(name);
                }
                Err(error) => {
                    tracing::warn!(index, name = %name, error = %error, "batch item failed");
                    result.failed += 1;
                    result.failures.push(ItemFailure { index, name, error });
                }
            }
        }

        tracing::info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "batch export finished"
        );
        Ok(result)
    }

    async fn process(
        &self,
        index: usize,
        name: &str,
        record: &RowRecord,
        ttl: TtlSpec,
        ec_level: ECLevel,
    ) -> Result<(), ItemError> {
        let token = self.codec.issue(record, ttl)?;
        tokio::task::yield_now().await;

        let payload = self.options.payload.build(token);
        let symbol = self.encoder.encode(payload.as_str(), ec_level, self.options.scale)?;

        let render = self.encoder.render_options();
        let bytes = match self.options.format {
            ArtifactFormat::Png => symbol.to_png(&render)?,
            ArtifactFormat::Svg => symbol.to_svg(&render).into_bytes(),
        };

        self.sink
            .deliver(Artifact {
                index,
                name: name.to_string(),
                media_type: self.options.format.media_type(),
                bytes,
            })
            .await?;
        Ok(())
    }
}
