use std::path::{Path, PathBuf};

use crate::shared::unique_path::unique_path;
use crate::video::domain::encode_error::EncodeError;
use crate::video::domain::rate_control::RateControl;

/// Extension of the fallback container used when the requested path maps
/// to no known container or to one without a usable video encoder.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Owns the container context and its single video stream.
///
/// Creation settles the final output path (collision avoidance, at most
/// one rewrite to the fallback container) and negotiates the codec; the
/// header is written exactly once, the trailer exactly once, and the IO
/// sink closes when the context drops.
pub struct Output {
    octx: ffmpeg_next::format::context::Output,
    path: PathBuf,
    stream_index: usize,
    stream_time_base: ffmpeg_next::Rational,
}

impl Output {
    /// Allocates the container context for `path` and adds the video
    /// stream. Returns the codec the container negotiated.
    ///
    /// An unrecognized extension, or a container whose default video codec
    /// has no encoder, is retried exactly once against the default
    /// container; failing again is fatal.
    pub fn create(path: &Path) -> Result<(Self, ffmpeg_next::Codec), EncodeError> {
        ffmpeg_next::init().map_err(EncodeError::Init)?;

        if path.as_os_str().is_empty() || path.file_name().is_none() {
            return Err(EncodeError::InvalidPath {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| EncodeError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let mut path = unique_path(path).ok_or_else(|| EncodeError::NoUniquePath {
            path: path.to_path_buf(),
        })?;

        let mut fell_back = false;
        let mut octx = match ffmpeg_next::format::output(&path) {
            Ok(octx) => octx,
            Err(_) => {
                fell_back = true;
                path = fallback_path(&path)?;
                ffmpeg_next::format::output(&path).map_err(|source| EncodeError::Format {
                    path: path.clone(),
                    source,
                })?
            }
        };

        let codec = match default_video_codec(&octx) {
            Some(codec) => codec,
            None if !fell_back => {
                let container = octx.format().name().to_string();
                // Drop the half-created sink and remove the empty file it
                // left behind before retrying.
                drop(octx);
                let _ = std::fs::remove_file(&path);
                path = fallback_path(&path)?;
                octx = ffmpeg_next::format::output(&path).map_err(|source| EncodeError::Format {
                    path: path.clone(),
                    source,
                })?;
                default_video_codec(&octx).ok_or(EncodeError::CodecNotFound { container })?
            }
            None => {
                return Err(EncodeError::CodecNotFound {
                    container: octx.format().name().to_string(),
                })
            }
        };

        let stream_index = octx
            .add_stream(Some(codec))
            .map_err(EncodeError::CreateStream)?
            .index();

        Ok((
            Self {
                octx,
                path,
                stream_index,
                stream_time_base: ffmpeg_next::Rational(1, 1),
            },
            codec,
        ))
    }

    /// Whether the container wants codecs to emit global extradata instead
    /// of in-band headers.
    pub fn global_header(&self) -> bool {
        self.octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER)
    }

    /// Mirrors the opened encoder's parameters onto the stream, then lets
    /// the rate-control policy override what the copy computed.
    pub fn propagate_parameters(
        &mut self,
        encoder: &ffmpeg_next::codec::encoder::video::Encoder,
        rate_control: &RateControl,
    ) {
        let mut ost = self.octx.stream_mut(self.stream_index).unwrap();
        ost.set_parameters(encoder);
        rate_control.after_propagation(&mut ost);
    }

    pub fn write_header(&mut self) -> Result<(), EncodeError> {
        self.octx.write_header().map_err(EncodeError::Header)?;
        // The muxer may replace the stream time base while writing the
        // header; presentation timestamps must use the settled value.
        self.stream_time_base = self.octx.stream(self.stream_index).unwrap().time_base();
        Ok(())
    }

    /// Stream time base as settled by the muxer during `write_header`.
    pub fn stream_time_base(&self) -> ffmpeg_next::Rational {
        self.stream_time_base
    }

    /// Hands one encoded packet to the muxer for interleaved writing.
    /// Ordering across the stream follows submission order.
    pub fn write_packet(&mut self, packet: &mut ffmpeg_next::Packet) -> Result<(), EncodeError> {
        packet.set_stream(self.stream_index);
        packet
            .write_interleaved(&mut self.octx)
            .map_err(EncodeError::WritePacket)
    }

    /// Writes the trailer. Must run after the encoder was flushed and at
    /// most once; the orchestrator's state machine guards both.
    pub fn close(&mut self) -> Result<(), EncodeError> {
        self.octx.write_trailer().map_err(EncodeError::Trailer)
    }

    /// Final output path, after collision avoidance and any container
    /// fallback rewrite.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn fallback_path(path: &Path) -> Result<PathBuf, EncodeError> {
    let with_default = path.with_extension(DEFAULT_EXTENSION);
    unique_path(&with_default).ok_or(EncodeError::NoUniquePath { path: with_default })
}

fn default_video_codec(
    octx: &ffmpeg_next::format::context::Output,
) -> Option<ffmpeg_next::Codec> {
    // ffmpeg-next does not expose the container's preferred codec ids.
    // Safety: read-only access to the static format descriptor.
    let id = unsafe { (*octx.format().as_ptr()).video_codec };
    ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::from(id))
}
