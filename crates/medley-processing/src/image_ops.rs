//! Image introspection, thumbnailing, and optimization.

use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{
    AnimationDecoder, ColorType, DynamicImage, GenericImageView, ImageEncoder, ImageFormat,
};

use medley_core::models::job::ImageOutputFormat;

/// Fixed thumbnail specs. Both sizes are regenerated on every thumbnail job;
/// renditions are overwritten by key, so re-delivery is idempotent.
pub const THUMBNAIL_SMALL: ThumbnailSpec = ThumbnailSpec {
    name: "thumbnail_small",
    max_dimension: 256,
    jpeg_quality: 85,
};

pub const THUMBNAIL_LARGE: ThumbnailSpec = ThumbnailSpec {
    name: "thumbnail_large",
    max_dimension: 640,
    jpeg_quality: 90,
};

const OPTIMIZE_JPEG_QUALITY: u8 = 82;
const OPTIMIZE_WEBP_QUALITY: f32 = 80.0;

/// A fixed-size thumbnail target.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailSpec {
    /// Rendition key the thumbnail is stored under.
    pub name: &'static str,
    /// Bounding box; the image is resized to fit inside without upscaling.
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

/// Intrinsic properties read from image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageIntrospection {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub color_space: String,
    pub has_alpha: bool,
    /// Animation frame count; `None` for still formats.
    pub frame_count: Option<u32>,
}

/// An encoded thumbnail with its final dimensions.
#[derive(Debug, Clone)]
pub struct ThumbnailOutput {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn color_space_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 => "Grayscale",
        ColorType::La8 | ColorType::La16 => "GrayscaleAlpha",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA",
        _ => "Unknown",
    }
}

fn format_name(format: ImageFormat) -> String {
    format!("{:?}", format).to_lowercase()
}

/// Read intrinsic width/height/format/color space/alpha/animation frame count.
pub fn introspect(data: &[u8]) -> Result<ImageIntrospection> {
    let format = image::guess_format(data).context("Unrecognized image format")?;
    let img = image::load_from_memory(data).context("Failed to decode image")?;
    let (width, height) = img.dimensions();
    let color = img.color();

    let frame_count = match format {
        ImageFormat::Gif => {
            let decoder = image::codecs::gif::GifDecoder::new(Cursor::new(data))
                .context("Failed to decode GIF")?;
            Some(decoder.into_frames().count() as u32)
        }
        _ => None,
    };

    Ok(ImageIntrospection {
        width,
        height,
        format: format_name(format),
        color_space: color_space_name(color).to_string(),
        has_alpha: color.has_alpha(),
        frame_count,
    })
}

/// Target dimensions for fitting `(width, height)` inside a square bounding
/// box without upscaling.
fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let scale = max_dimension as f32 / width.max(height) as f32;
    let w = ((width as f32 * scale).round() as u32).max(1);
    let h = ((height as f32 * scale).round() as u32).max(1);
    (w, h)
}

/// Select a resampling filter based on how aggressive the downscale is.
fn select_filter(orig_width: u32, orig_height: u32, new_width: u32) -> image::imageops::FilterType {
    let ratio = orig_width.max(orig_height) as f32 / new_width.max(1) as f32;
    if ratio > 2.0 {
        image::imageops::FilterType::Triangle
    } else {
        image::imageops::FilterType::Lanczos3
    }
}

/// Generate a JPEG thumbnail fitting inside `spec.max_dimension`, re-encoded
/// at the spec's fixed quality. Never upscales.
pub fn generate_thumbnail(data: &[u8], spec: &ThumbnailSpec) -> Result<ThumbnailOutput> {
    let img = image::load_from_memory(data).context("Failed to decode image")?;
    let (orig_width, orig_height) = img.dimensions();
    let (width, height) = fit_within(orig_width, orig_height, spec.max_dimension);

    let resized = if (width, height) == (orig_width, orig_height) {
        img
    } else {
        let filter = select_filter(orig_width, orig_height, width);
        img.resize_exact(width, height, filter)
    };

    let rgb = resized.to_rgb8();
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, spec.jpeg_quality);
    encoder
        .write_image(rgb.as_raw(), width, height, ColorType::Rgb8.into())
        .context("Failed to encode thumbnail JPEG")?;

    Ok(ThumbnailOutput {
        data: out,
        width,
        height,
    })
}

/// Re-encode an image with fixed, format-specific settings. Produces a
/// standalone optimized object; the input dimensions are preserved.
pub fn optimize_image(data: &[u8], format: ImageOutputFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data).context("Failed to decode image")?;
    let (width, height) = img.dimensions();

    match format {
        ImageOutputFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let mut out = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut out, OPTIMIZE_JPEG_QUALITY);
            encoder
                .write_image(rgb.as_raw(), width, height, ColorType::Rgb8.into())
                .context("Failed to encode JPEG")?;
            Ok(out)
        }
        ImageOutputFormat::Png => {
            let rgba = img.to_rgba8();
            let mut out = Vec::new();
            let encoder = PngEncoder::new(&mut out);
            encoder
                .write_image(rgba.as_raw(), width, height, ColorType::Rgba8.into())
                .context("Failed to encode PNG")?;
            Ok(out)
        }
        ImageOutputFormat::WebP => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            let encoder = webp::Encoder::from_image(&rgba)
                .map_err(|e| anyhow!("Failed to prepare WebP encoder: {}", e))?;
            Ok(encoder.encode(OPTIMIZE_WEBP_QUALITY).to_vec())
        }
    }
}
