//! Video frame types and processing

use image::RgbImage;

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the source started)
    pub timestamp_ns: u64,
    /// Frame sequence number
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

    /// Decode an encoded still (PNG, JPEG, BMP, ...) into an RGB frame.
    ///
    /// The container format is guessed from the leading bytes, so uploads
    /// without a file extension decode the same way as files on disk.
    pub fn decode(bytes: &[u8]) -> Result<Self, CameraError> {
        if bytes.is_empty() {
            return Err(CameraError::Format("empty image payload".into()));
        }
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_rgb_image(img.to_rgb8()))
    }

    /// Wrap an already decoded RGB image
    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, 0, 0)
    }

    /// Copy the frame into an `image` buffer, `None` if the buffer size is inconsistent
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}
