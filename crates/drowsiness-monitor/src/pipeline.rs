//! One sampling step: grab, encode, analyze

use analysis_client::{AnalysisOutcome, CodecError, FrameAnalyzer, FrameCodec};
use camera_capture::{CameraError, CaptureResource};
use std::sync::Arc;
use tracing::debug;

/// Result of one tick's exchange
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The frame reached the analyzer
    Analyzed(AnalysisOutcome),
    /// Grab failed but the stream is still live
    CaptureFailed(CameraError),
    /// Frame could not be encoded; nothing was sent
    EncodeFailed(CodecError),
    /// The stream is gone
    StreamLost,
}

impl TickOutcome {
    /// Whether the session cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, TickOutcome::StreamLost)
    }
}

/// Capture, codec and analyzer wired together
pub struct SamplePipeline {
    capture: Arc<CaptureResource>,
    codec: FrameCodec,
    analyzer: Arc<dyn FrameAnalyzer>,
}

impl SamplePipeline {
    pub fn new(capture: Arc<CaptureResource>, codec: FrameCodec, analyzer: Arc<dyn FrameAnalyzer>) -> Self {
        Self {
            capture,
            codec,
            analyzer,
        }
    }

    /// Run one exchange
    pub async fn run_once(&self) -> TickOutcome {
        if !self.capture.is_active().await {
            return TickOutcome::StreamLost;
        }

        let frame = match self.capture.grab_frame().await {
            Ok(frame) => frame,
            Err(e) if e.is_stream_lost() => return TickOutcome::StreamLost,
            Err(e) => {
                if !self.capture.is_active().await {
                    return TickOutcome::StreamLost;
                }
                return TickOutcome::CaptureFailed(e);
            }
        };

        let sample = match self.codec.sample(&frame) {
            Ok(sample) => sample,
            Err(e) => return TickOutcome::EncodeFailed(e),
        };
        debug!(
            "Frame {} encoded ({} bytes)",
            sample.sequence,
            sample.payload.len()
        );

        TickOutcome::Analyzed(self.analyzer.analyze(&sample).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_client::FrameSample;
    use async_trait::async_trait;
    use camera_capture::{CameraConfig, MockCamera};

    struct Awake;

    #[async_trait]
    impl FrameAnalyzer for Awake {
        async fn analyze(&self, sample: &FrameSample) -> AnalysisOutcome {
            assert!(sample.payload.as_str().starts_with("data:image/jpeg;base64,"));
            AnalysisOutcome::Success {
                ear: Some(0.31),
                frames_closed: 0,
                alert: false,
            }
        }
    }

    async fn pipeline(camera: &MockCamera) -> SamplePipeline {
        let capture = Arc::new(CaptureResource::new(
            Arc::new(camera.clone()),
            CameraConfig::default(),
        ));
        capture.acquire().await.unwrap();
        SamplePipeline::new(capture, FrameCodec::default(), Arc::new(Awake))
    }

    #[tokio::test]
    async fn test_frame_reaches_analyzer() {
        let camera = MockCamera::new();
        let outcome = pipeline(&camera).await.run_once().await;
        assert!(matches!(
            outcome,
            TickOutcome::Analyzed(AnalysisOutcome::Success { alert: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_grab_failure_on_live_stream() {
        let camera = MockCamera::new();
        let pipeline = pipeline(&camera).await;
        camera.fail_next_grabs(1);

        let outcome = pipeline.run_once().await;
        assert!(matches!(outcome, TickOutcome::CaptureFailed(_)));
        assert!(!outcome.is_fatal());
        assert!(matches!(pipeline.run_once().await, TickOutcome::Analyzed(_)));
    }

    #[tokio::test]
    async fn test_disconnected_stream_is_fatal() {
        let camera = MockCamera::new();
        let pipeline = pipeline(&camera).await;
        camera.disconnect();

        let outcome = pipeline.run_once().await;
        assert_eq!(outcome, TickOutcome::StreamLost);
        assert!(outcome.is_fatal());
    }
}
