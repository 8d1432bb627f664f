//! Medley Processing Library
//!
//! Media transformation primitives used by the workers: image introspection
//! and thumbnailing via the `image` crate, video probing/transcoding via
//! external `ffprobe`/`ffmpeg` subprocesses, document statistics, and
//! suggested-tag generation. Everything here is synchronous with respect to
//! the asset lifecycle — callers own status transitions and storage writes.

pub mod document;
pub mod image_ops;
pub mod tags;
pub mod video;

pub use document::{estimate_pdf_page_count, text_stats, DocumentStats};
pub use image_ops::{
    generate_thumbnail, introspect, optimize_image, ImageIntrospection, ThumbnailOutput,
    ThumbnailSpec, THUMBNAIL_LARGE, THUMBNAIL_SMALL,
};
pub use tags::suggest_tags;
pub use video::{FfmpegTool, VideoProbe};
