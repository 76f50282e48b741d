//! Frame encoding for transport

use base64::{engine::general_purpose, Engine as _};
use camera_capture::VideoFrame;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;

/// Prefix of every encoded payload
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Encoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Empty frame ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Frame buffer has {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },

    #[error("JPEG encode failed: {0}")]
    Jpeg(String),
}

/// A JPEG frame as a base64 data URI, ready to embed in a form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload(String);

impl EncodedPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode back to JPEG bytes
    pub fn jpeg_bytes(&self) -> Option<Vec<u8>> {
        let encoded = self.0.strip_prefix(JPEG_DATA_URI_PREFIX)?;
        general_purpose::STANDARD.decode(encoded).ok()
    }
}

/// One tick's worth of data for the analysis service
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub payload: EncodedPayload,
    pub captured_at: DateTime<Utc>,
    pub sequence: u32,
}

/// Converts captured frames to JPEG data URIs
#[derive(Debug, Clone)]
pub struct FrameCodec {
    quality: u8,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(92)
    }
}

impl FrameCodec {
    /// Create a codec with the given JPEG quality (clamped to 1-100)
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a frame. Zero-dimension or size-inconsistent frames are rejected.
    pub fn encode(&self, frame: &VideoFrame) -> Result<EncodedPayload, CodecError> {
        if frame.is_empty() {
            return Err(CodecError::EmptyFrame {
                width: frame.width,
                height: frame.height,
            });
        }

        let rgb = frame.to_rgb_image().ok_or(CodecError::BufferMismatch {
            expected: frame.expected_len(),
            actual: frame.data.len(),
        })?;

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&rgb)
            .map_err(|e| CodecError::Jpeg(e.to_string()))?;

        let mut uri = String::with_capacity(JPEG_DATA_URI_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
        uri.push_str(JPEG_DATA_URI_PREFIX);
        general_purpose::STANDARD.encode_string(&jpeg, &mut uri);
        Ok(EncodedPayload(uri))
    }

    /// Encode a frame into a sample stamped with its capture time
    pub fn sample(&self, frame: &VideoFrame) -> Result<FrameSample, CodecError> {
        Ok(FrameSample {
            payload: self.encode(frame)?,
            captured_at: frame.captured_at(),
            sequence: frame.sequence,
        })
    }
}
