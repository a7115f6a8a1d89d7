use std::path::{Path, PathBuf};

use crate::video::domain::encode_error::EncodeError;
use crate::video::domain::encode_logger::{EncodeLogger, NullEncodeLogger};
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::rate_control::RateControl;
use crate::video::infrastructure::encoder::Encoder;
use crate::video::infrastructure::image_buffer::ImageBuffer;
use crate::video::infrastructure::output::Output;
use crate::video::infrastructure::pixel_converter::PixelConverter;

/// Alignment of the tightly packed RGB staging buffer.
const SOURCE_ALIGNMENT: usize = 1;
/// Alignment of the converted buffer the scaler writes into.
const DESTINATION_ALIGNMENT: usize = 4;

/// Writes a sequence of raw RGB frames to a compressed video (or animated
/// GIF) file on disk.
///
/// Lifecycle is not-started → started → finished, driven lazily by the
/// first [`append_frame`](Self::append_frame) or explicitly by
/// [`start`](Self::start); a started encoder that is dropped unfinished
/// finishes itself so no truncated file is left behind. One instance per
/// output file; not reusable after finishing.
pub struct VideoEncoder {
    path: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    rate_control: RateControl,
    logger: Box<dyn EncodeLogger>,
    pipeline: Option<Pipeline>,
    started: bool,
    finished: bool,
    frame_index: u64,
}

/// The native resources alive between start and drop. Field order fixes
/// teardown: container, codec, converter, then the image buffers.
struct Pipeline {
    output: Output,
    encoder: Encoder,
    converter: PixelConverter,
    rgb_image: ImageBuffer,
    converted_image: ImageBuffer,
}

impl VideoEncoder {
    /// Encoder targeting an average bitrate in bits per second.
    pub fn constant_bitrate(
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        fps: u32,
        bitrate: u64,
    ) -> Self {
        Self::with_rate_control(path, width, height, fps, RateControl::ConstantBitrate { bitrate })
    }

    /// Encoder targeting a constant rate factor; lower is higher quality.
    pub fn constant_quality(
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        fps: u32,
        crf: u32,
    ) -> Self {
        Self::with_rate_control(path, width, height, fps, RateControl::ConstantQuality { crf })
    }

    /// Encoder producing a reduced-palette animated GIF; the output
    /// extension is rewritten to `.gif`.
    pub fn palette_gif(path: impl Into<PathBuf>, width: u32, height: u32, fps: u32) -> Self {
        let mut path = path.into();
        path.set_extension("gif");
        Self::with_rate_control(path, width, height, fps, RateControl::PaletteGif)
    }

    fn with_rate_control(
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        fps: u32,
        rate_control: RateControl,
    ) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            fps: fps.max(1),
            rate_control,
            logger: Box::new(NullEncodeLogger),
            pipeline: None,
            started: false,
            finished: false,
            frame_index: 0,
        }
    }

    /// Replaces the default silent logging sink.
    pub fn with_logger(mut self, logger: Box<dyn EncodeLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Brings up the whole pipeline: container and codec negotiation,
    /// two-phase rate-control injection around parameter propagation,
    /// header, reusable frame, both image buffers, and the converter.
    ///
    /// Runs at most once; a second call fails instead of leaking the first
    /// set of native resources.
    pub fn start(&mut self) -> Result<(), EncodeError> {
        if self.started {
            return Err(EncodeError::AlreadyStarted);
        }
        if self.width == 0 || self.height == 0 {
            return Err(EncodeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let (mut output, codec) = Output::create(&self.path)?;

        let mut context =
            Encoder::configure(codec, self.width, self.height, self.fps, output.global_header())?;
        let mut options = Encoder::codec_options(codec);
        self.rate_control.before_propagation(&mut context, &mut options);
        let opened = context.open_with(options).map_err(EncodeError::CodecOpen)?;
        output.propagate_parameters(&opened, &self.rate_control);

        output.write_header()?;

        let encoder = Encoder::from_opened(opened, self.fps)?;
        let destination_format = encoder.pixel_format();
        let rgb_image = ImageBuffer::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
            SOURCE_ALIGNMENT,
        )?;
        let converted_image =
            ImageBuffer::new(destination_format, self.width, self.height, DESTINATION_ALIGNMENT)?;
        let converter = PixelConverter::new(
            ffmpeg_next::format::Pixel::RGB24,
            destination_format,
            self.width,
            self.height,
        )?;

        self.logger.info(&format!(
            "encoding {} ({}x{} @ {} fps, {})",
            output.path().display(),
            self.width,
            self.height,
            self.fps,
            codec.name(),
        ));

        self.pipeline = Some(Pipeline {
            output,
            encoder,
            converter,
            rgb_image,
            converted_image,
        });
        self.started = true;
        Ok(())
    }

    /// Appends one frame of tightly packed 8-bit RGB triplets, row-major
    /// with row 0 at the bottom of the image (the orientation a GL
    /// framebuffer readback produces). Starts the pipeline on first use.
    pub fn append_frame(&mut self, rgb: &[u8]) -> Result<(), EncodeError> {
        if self.finished {
            return Err(EncodeError::AlreadyFinished);
        }
        if !self.started {
            self.start()?;
        }

        let expected = 3 * self.width as usize * self.height as usize;
        if rgb.len() != expected {
            return Err(EncodeError::FrameSize {
                expected,
                actual: rgb.len(),
            });
        }

        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(EncodeError::NotStarted);
        };

        copy_rgb_flipped(rgb, &mut pipeline.rgb_image);
        pipeline
            .converter
            .convert(&pipeline.rgb_image, &mut pipeline.converted_image)?;
        pipeline
            .encoder
            .encode_frame(&pipeline.converted_image, self.frame_index, &mut pipeline.output)?;

        self.frame_index += 1;
        Ok(())
    }

    /// Flushes the delayed frames the codec still buffers and closes the
    /// container. The encoder is not reusable afterwards.
    pub fn finish(&mut self) -> Result<(), EncodeError> {
        if !self.started {
            return Err(EncodeError::NotStarted);
        }
        if self.finished {
            return Err(EncodeError::AlreadyFinished);
        }
        // Terminal from here on even if flushing fails: the trailer must
        // never be written twice.
        self.finished = true;

        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(EncodeError::NotStarted);
        };
        pipeline.encoder.flush(&mut pipeline.output)?;
        pipeline.output.close()?;

        self.logger.info(&format!(
            "finished {} ({} frames)",
            pipeline.output.path().display(),
            self.frame_index,
        ));
        Ok(())
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn frames_count(&self) -> usize {
        self.frame_index as usize
    }

    /// Final output path: the configured one until start, afterwards the
    /// settled path including collision-avoidance and container-fallback
    /// rewrites.
    pub fn output_path(&self) -> &Path {
        match &self.pipeline {
            Some(pipeline) => pipeline.output.path(),
            None => &self.path,
        }
    }
}

impl FrameSink for VideoEncoder {
    fn append_frame(&mut self, rgb: &[u8]) -> Result<(), EncodeError> {
        VideoEncoder::append_frame(self, rgb)
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        VideoEncoder::finish(self)
    }

    fn frames_count(&self) -> usize {
        VideoEncoder::frames_count(self)
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        if self.started && !self.finished {
            if let Err(error) = self.finish() {
                log::warn!("video encoder dropped before finish; cleanup failed: {error}");
            }
        }
    }
}

/// Copies the caller's bottom-to-top RGB rows into the staging buffer in
/// the codec's top-to-bottom order, honoring the buffer's padded stride.
fn copy_rgb_flipped(rgb: &[u8], image: &mut ImageBuffer) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let row_bytes = 3 * width;
    let stride = image.stride(0);
    let data = image.data_mut(0);
    for row in 0..height {
        let src = (height - 1 - row) * row_bytes;
        let dst = row * stride;
        data[dst..dst + row_bytes].copy_from_slice(&rgb[src..src + row_bytes]);
    }
}
