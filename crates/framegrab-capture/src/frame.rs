//! Raster and encoded frame types.

use bytes::Bytes;

/// MIME type of encoded captures.
pub const PNG_MIME_TYPE: &str = "image/png";

/// The visual content of a surface at one playhead position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    /// RGBA8 pixel data, row-major, no padding.
    pub data: Bytes,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,
}

impl RasterFrame {
    /// Create a new raster frame.
    pub fn new(data: Bytes, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Calculate expected RGBA buffer size for given dimensions.
    pub fn rgba_buffer_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// Validate that the frame data matches expected dimensions.
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::rgba_buffer_size(self.width, self.height)
    }
}

/// A losslessly encoded still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// PNG bytes.
    pub bytes: Bytes,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,
}

impl EncodedImage {
    /// MIME type of the payload.
    pub fn mime_type(&self) -> &'static str {
        PNG_MIME_TYPE
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the payload holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
