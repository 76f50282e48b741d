//! Video frame types

use chrono::{DateTime, Utc};
use image::RgbImage;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the Unix epoch)
    pub timestamp_ns: u64,
    /// Frame sequence number within the stream
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Wrap a decoded image, stamping it with the current time
    pub fn from_rgb_image(img: RgbImage, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            timestamp_ns: now_ns(),
            sequence,
        }
    }

    /// True for zero-dimension frames
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Expected buffer length for the frame dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Capture time as a UTC timestamp
    pub fn captured_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(i64::try_from(self.timestamp_ns).unwrap_or(i64::MAX))
    }

    /// Copy the pixels into an `image` buffer. `None` if the buffer length
    /// does not match the dimensions.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data.get(idx..idx + 3).map(|p| [p[0], p[1], p[2]])
    }
}

/// Nanoseconds since the Unix epoch
pub(crate) fn now_ns() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map(|ns| ns.max(0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_frame() {
        let frame = VideoFrame::new(Vec::new(), 0, 480, 0, 0);
        assert!(frame.is_empty());
        assert_eq!(frame.expected_len(), 0);
    }

    #[test]
    fn test_rgb_image_round() {
        let img = RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]));
        let frame = VideoFrame::from_rgb_image(img, 7);
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.get_pixel(3, 1), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(4, 0), None);
        assert!(frame.to_rgb_image().is_some());
    }

    #[test]
    fn test_inconsistent_buffer() {
        let frame = VideoFrame::new(vec![0; 5], 2, 2, 0, 0);
        assert!(frame.to_rgb_image().is_none());
        assert_eq!(frame.get_pixel(1, 1), None);
    }

    #[test]
    fn test_pixel_lookup_on_huge_dimensions() {
        let frame = VideoFrame::new(Vec::new(), 100_000, 100_000, 0, 0);
        assert_eq!(frame.get_pixel(99_999, 99_999), None);
    }

    #[test]
    fn test_captured_at_saturates() {
        let frame = VideoFrame::new(Vec::new(), 0, 0, u64::MAX, 0);
        assert!(frame.captured_at().timestamp() > 0);
    }

    #[test]
    fn test_captured_at() {
        let frame = VideoFrame::new(Vec::new(), 0, 0, 1_700_000_000_000_000_000, 0);
        assert_eq!(frame.captured_at().timestamp(), 1_700_000_000);
    }

    proptest! {
        #[test]
        fn prop_pixel_lookup_stays_in_bounds(w in 1u32..32, h in 1u32..32, x in 0u32..40, y in 0u32..40) {
            let frame = VideoFrame::new(vec![9; (w * h * 3) as usize], w, h, 0, 0);
            prop_assert_eq!(frame.expected_len(), frame.data.len());
            prop_assert_eq!(frame.get_pixel(x, y).is_some(), x < w && y < h);
        }
    }
}
