//! Raster-to-video encoding: turn a sequence of raw RGB frames into a
//! compressed video or animated-GIF file on disk.
//!
//! The public entry point is
//! [`video::infrastructure::video_encoder::VideoEncoder`]; rendering code
//! that should not depend on the codec stack can target
//! [`video::domain::frame_sink::FrameSink`] instead.

pub mod shared;
pub mod video;
