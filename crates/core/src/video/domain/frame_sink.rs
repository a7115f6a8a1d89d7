use crate::video::domain::encode_error::EncodeError;

/// Abstracts a destination for rendered RGB frames so the frame-producing
/// layer can hand buffers over without depending on a specific container
/// or codec library.
///
/// Frames are written in submission order; presentation timestamps are
/// derived from a strictly increasing frame counter.
pub trait FrameSink {
    /// Append one frame of tightly packed 8-bit RGB triplets, row-major,
    /// bottom-to-top row order, exactly `3 * width * height` bytes.
    fn append_frame(&mut self, rgb: &[u8]) -> Result<(), EncodeError>;

    /// Drain everything still buffered and close the destination. The sink
    /// is not reusable afterwards.
    fn finish(&mut self) -> Result<(), EncodeError>;

    /// Number of frames appended so far.
    fn frames_count(&self) -> usize;
}
