use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the encoding pipeline, grouped by the stage that
/// detects them: configuration, allocation, codec negotiation, container
/// I/O, protocol misuse, and encoding proper.
///
/// Every operation either completes its documented effect or returns one
/// of these; nothing is retried behind the caller's back except the single
/// container/codec fallback in `Output::create`.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid output path {path:?}")]
    InvalidPath { path: PathBuf },

    #[error("video dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("failed to initialize the ffmpeg backend: {0}")]
    Init(#[source] ffmpeg_next::Error),

    #[error("no container format matches {path:?}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: ffmpeg_next::Error,
    },

    #[error("could not derive a collision-free variant of {path:?}")]
    NoUniquePath { path: PathBuf },

    #[error("failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable video encoder for container '{container}'")]
    CodecNotFound { container: String },

    #[error("failed to open codec: {0}")]
    CodecOpen(#[source] ffmpeg_next::Error),

    #[error("failed to allocate {0}")]
    Allocation(&'static str),

    #[error("failed to create the output stream: {0}")]
    CreateStream(#[source] ffmpeg_next::Error),

    #[error("failed to write the container header: {0}")]
    Header(#[source] ffmpeg_next::Error),

    #[error("failed to write the container trailer: {0}")]
    Trailer(#[source] ffmpeg_next::Error),

    #[error("pixel format conversion failed: {0}")]
    Converter(#[source] ffmpeg_next::Error),

    #[error(
        "converter requires matching dimensions, got {src_width}x{src_height} \
         -> {dst_width}x{dst_height}"
    )]
    DimensionMismatch {
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    #[error("frame plane {plane} needs {needed} bytes per line, destination has {available}")]
    PlaneBounds {
        plane: usize,
        needed: usize,
        available: usize,
    },

    #[error("encoder rejected the submitted frame: {0}")]
    SendFrame(#[source] ffmpeg_next::Error),

    #[error("failed to drain encoded packets: {0}")]
    ReceivePacket(#[source] ffmpeg_next::Error),

    #[error("failed to write an encoded packet: {0}")]
    WritePacket(#[source] ffmpeg_next::Error),

    #[error("expected {expected} RGB bytes per frame, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("encoding has already started")]
    AlreadyStarted,

    #[error("encoding has not started yet")]
    NotStarted,

    #[error("encoding has already finished")]
    AlreadyFinished,
}
