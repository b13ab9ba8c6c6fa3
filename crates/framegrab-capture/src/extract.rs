//! Still-frame extraction.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::{debug, instrument};

use framegrab_ipc::VideoInfo;

use crate::error::CaptureError;
use crate::frame::{EncodedImage, RasterFrame};
use crate::surface::RenderSurface;
use crate::CaptureResult;

/// Rasterize the surface's current frame at native resolution and encode it
/// as PNG.
///
/// The caller freezes the playhead first. Fails with
/// [`CaptureError::MetadataUnavailable`] while either dimension is unknown.
/// Two captures at the same frozen position produce identical bytes.
#[instrument(name = "capture_frame", skip_all, fields(file = %video_info.file_name))]
pub fn capture_frame(
    surface: &mut dyn RenderSurface,
    video_info: &VideoInfo,
) -> CaptureResult<EncodedImage> {
    if !video_info.has_dimensions() {
        return Err(CaptureError::MetadataUnavailable {
            width: video_info.width,
            height: video_info.height,
        });
    }

    let frame = surface.current_visual_frame()?;
    let canvas = rasterize(&frame, video_info.width, video_info.height)?;
    let bytes = encode_png(&canvas)?;

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        bytes = bytes.len(),
        "Frame captured"
    );

    Ok(EncodedImage {
        bytes,
        width: canvas.width(),
        height: canvas.height(),
    })
}

/// Copy `frame` into a `width x height` canvas, pixel for pixel.
///
/// A frame of another size lands at the origin: extra pixels are cropped,
/// missing ones stay transparent black.
fn rasterize(frame: &RasterFrame, width: u32, height: u32) -> CaptureResult<RgbaImage> {
    if !frame.is_valid() {
        return Err(CaptureError::FrameConversion(format!(
            "{} bytes for {}x{} RGBA frame",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let source = RgbaImage::from_raw(frame.width, frame.height, frame.data.to_vec())
        .ok_or_else(|| CaptureError::FrameConversion("raster buffer too small".to_string()))?;

    if source.dimensions() == (width, height) {
        return Ok(source);
    }

    debug!(
        frame_width = frame.width,
        frame_height = frame.height,
        width,
        height,
        "Frame size differs from native size"
    );
    let mut canvas = RgbaImage::new(width, height);
    image::imageops::replace(&mut canvas, &source, 0, 0);
    Ok(canvas)
}

fn encode_png(canvas: &RgbaImage) -> CaptureResult<Bytes> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        canvas.as_raw(),
        canvas.width(),
        canvas.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(Bytes::from(bytes))
}
