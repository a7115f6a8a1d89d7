use crate::video::domain::encode_error::EncodeError;

/// An owned raw pixel buffer with per-plane stride, tagged with a pixel
/// format and dimensions.
///
/// Backed by an `ffmpeg_next` video frame allocated with a caller-chosen
/// byte alignment, so plane strides may exceed the packed row width.
/// Created once per pipeline side (source RGB, converted destination) and
/// never resized.
pub struct ImageBuffer {
    frame: ffmpeg_next::util::frame::video::Video,
}

impl ImageBuffer {
    pub fn new(
        format: ffmpeg_next::format::Pixel,
        width: u32,
        height: u32,
        alignment: usize,
    ) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions { width, height });
        }

        let mut frame = ffmpeg_next::util::frame::video::Video::empty();
        frame.set_format(format);
        frame.set_width(width);
        frame.set_height(height);

        // The safe constructor pins the alignment at 32; going through the
        // ffi keeps it caller-controlled. A negative return leaves the
        // frame unallocated, so no partially constructed buffer escapes.
        //
        // Safety: format/width/height are set above, which is all
        // av_frame_get_buffer reads; the frame owns the resulting buffers.
        let ret = unsafe {
            ffmpeg_next::ffi::av_frame_get_buffer(frame.as_mut_ptr(), alignment as std::ffi::c_int)
        };
        if ret < 0 {
            return Err(EncodeError::Allocation("image buffer"));
        }

        Ok(Self { frame })
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn format(&self) -> ffmpeg_next::format::Pixel {
        self.frame.format()
    }

    pub fn planes(&self) -> usize {
        self.frame.planes()
    }

    /// Bytes per row of `plane`, including any alignment padding.
    pub fn stride(&self, plane: usize) -> usize {
        self.frame.stride(plane)
    }

    /// Rows in `plane`; chroma planes of 4:2:0 formats are half height.
    pub fn plane_height(&self, plane: usize) -> u32 {
        if plane == 0 {
            return self.height();
        }
        match self.format() {
            ffmpeg_next::format::Pixel::YUV420P => (self.height() + 1) / 2,
            _ => self.height(),
        }
    }

    /// Packed (padding-free) bytes per row of `plane`.
    pub fn packed_linesize(&self, plane: usize) -> Result<usize, EncodeError> {
        // Safety: pure computation over the format descriptor.
        let size = unsafe {
            ffmpeg_next::ffi::av_image_get_linesize(
                ffmpeg_next::ffi::AVPixelFormat::from(self.format()),
                self.width() as std::ffi::c_int,
                plane as std::ffi::c_int,
            )
        };
        if size < 0 {
            return Err(EncodeError::Allocation("plane linesize"));
        }
        Ok(size as usize)
    }

    pub fn data(&self, plane: usize) -> &[u8] {
        self.frame.data(plane)
    }

    pub fn data_mut(&mut self, plane: usize) -> &mut [u8] {
        self.frame.data_mut(plane)
    }

    pub(crate) fn frame(&self) -> &ffmpeg_next::util::frame::video::Video {
        &self.frame
    }

    pub(crate) fn frame_mut(&mut self) -> &mut ffmpeg_next::util::frame::video::Video {
        &mut self.frame
    }
}
