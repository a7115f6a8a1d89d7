use ffmpeg_next::util::error::EAGAIN;

use crate::video::domain::encode_error::EncodeError;
use crate::video::infrastructure::image_buffer::ImageBuffer;
use crate::video::infrastructure::output::Output;

/// Owns the opened codec context plus the single reusable frame and packet
/// every appended frame passes through; nothing is allocated per frame.
pub struct Encoder {
    // Field order fixes teardown: packet, then frame, then the codec
    // context.
    packet: ffmpeg_next::Packet,
    frame: ffmpeg_next::util::frame::video::Video,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    fps: u32,
}

impl Encoder {
    /// Builds the unopened codec context with the generic parameters every
    /// rate-control mode shares: time base 1/fps, framerate fps/1, and a
    /// small reordering window that bounds the delayed-frame backlog the
    /// flush has to drain.
    pub fn configure(
        codec: ffmpeg_next::Codec,
        width: u32,
        height: u32,
        fps: u32,
        global_header: bool,
    ) -> Result<ffmpeg_next::codec::encoder::video::Video, EncodeError> {
        let mut context = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(EncodeError::CodecOpen)?;

        context.set_width(width);
        context.set_height(height);
        context.set_format(ffmpeg_next::format::Pixel::YUV420P);
        context.set_time_base(ffmpeg_next::Rational(1, fps as i32));
        context.set_frame_rate(Some(ffmpeg_next::Rational(fps as i32, 1)));
        context.set_gop(10);
        context.set_max_b_frames(1);
        if global_header {
            context.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        Ok(context)
    }

    /// Private options handed to the codec open call. The H.264/H.265
    /// families get the slower, higher-quality preset.
    pub fn codec_options(codec: ffmpeg_next::Codec) -> ffmpeg_next::Dictionary<'static> {
        let mut options = ffmpeg_next::Dictionary::new();
        if matches!(
            codec.id(),
            ffmpeg_next::codec::Id::H264 | ffmpeg_next::codec::Id::HEVC
        ) {
            options.set("preset", "slow");
        }
        options
    }

    /// Wraps an opened codec context and allocates the reusable frame
    /// sized to the context's negotiated format and dimensions.
    pub fn from_opened(
        encoder: ffmpeg_next::codec::encoder::video::Encoder,
        fps: u32,
    ) -> Result<Self, EncodeError> {
        let mut frame = ffmpeg_next::util::frame::video::Video::empty();
        frame.set_format(encoder.format());
        frame.set_width(encoder.width());
        frame.set_height(encoder.height());
        // Safety: format/width/height are set above; the frame owns the
        // resulting buffers.
        let ret = unsafe { ffmpeg_next::ffi::av_frame_get_buffer(frame.as_mut_ptr(), 0) };
        if ret < 0 {
            return Err(EncodeError::Allocation("encoder frame"));
        }

        Ok(Self {
            packet: ffmpeg_next::Packet::empty(),
            frame,
            encoder,
            fps,
        })
    }

    /// Pixel format the opened codec settled on; the conversion side of
    /// the pipeline must produce exactly this.
    pub fn pixel_format(&self) -> ffmpeg_next::format::Pixel {
        self.encoder.format()
    }

    /// Copies `converted` into the reusable frame, stamps the presentation
    /// timestamp for frame `index`, submits, and drains every packet the
    /// codec is immediately willing to emit.
    pub fn encode_frame(
        &mut self,
        converted: &ImageBuffer,
        index: u64,
        output: &mut Output,
    ) -> Result<(), EncodeError> {
        // The codec may still reference the frame buffer from the previous
        // submission; this copies it out if so.
        // Safety: the frame is fully initialized by `from_opened`.
        let ret = unsafe { ffmpeg_next::ffi::av_frame_make_writable(self.frame.as_mut_ptr()) };
        if ret < 0 {
            return Err(EncodeError::Allocation("writable encoder frame"));
        }

        // Line-by-line copy: the two buffers generally disagree on padded
        // stride, and the destination stride must be proven to hold a
        // packed row before any row is copied.
        for plane in 0..converted.planes() {
            let row_bytes = converted.packed_linesize(plane)?;
            let rows = converted.plane_height(plane) as usize;
            let src_stride = converted.stride(plane);
            let dst_stride = self.frame.stride(plane);
            if dst_stride < row_bytes || src_stride < row_bytes {
                return Err(EncodeError::PlaneBounds {
                    plane,
                    needed: row_bytes,
                    available: dst_stride.min(src_stride),
                });
            }
            let src = converted.data(plane);
            let dst = self.frame.data_mut(plane);
            for row in 0..rows {
                dst[row * dst_stride..row * dst_stride + row_bytes]
                    .copy_from_slice(&src[row * src_stride..row * src_stride + row_bytes]);
            }
        }

        // Presentation timestamps are expressed directly in the settled
        // stream time base, so packets need no further rescaling.
        let time_base = output.stream_time_base();
        let pts = index as i64 * time_base.denominator() as i64
            / (time_base.numerator() as i64 * self.fps as i64);
        self.frame.set_pts(Some(pts));

        self.encoder
            .send_frame(&self.frame)
            .map_err(EncodeError::SendFrame)?;
        self.drain(output)
    }

    /// Signals end of stream and drains the packets the codec buffered for
    /// reordering. Mandatory before the container closes, or the tail of
    /// the video is silently dropped.
    pub fn flush(&mut self, output: &mut Output) -> Result<(), EncodeError> {
        match self.encoder.send_eof() {
            Ok(()) | Err(ffmpeg_next::Error::Eof) => {}
            Err(source) => return Err(EncodeError::SendFrame(source)),
        }
        self.drain(output)
    }

    fn drain(&mut self, output: &mut Output) -> Result<(), EncodeError> {
        loop {
            match self.encoder.receive_packet(&mut self.packet) {
                Ok(()) => output.write_packet(&mut self.packet)?,
                Err(ffmpeg_next::Error::Eof) => break,
                Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => break,
                Err(source) => return Err(EncodeError::ReceivePacket(source)),
            }
        }
        Ok(())
    }
}
