use crate::video::domain::encode_error::EncodeError;
use crate::video::infrastructure::image_buffer::ImageBuffer;

/// Converts between pixel formats at fixed dimensions using ffmpeg's
/// software scaler with a bilinear filter.
///
/// The scaler context holds scratch state keyed by the
/// (source format, destination format, width, height) tuple. It is built
/// once at pipeline start and reused for every frame; rebuilding it per
/// frame is a correctness requirement of the pipeline, not an
/// optimization, so this type owns the one context for its lifetime.
pub struct PixelConverter {
    context: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
}

impl PixelConverter {
    pub fn new(
        source: ffmpeg_next::format::Pixel,
        destination: ffmpeg_next::format::Pixel,
        width: u32,
        height: u32,
    ) -> Result<Self, EncodeError> {
        let context = ffmpeg_next::software::scaling::Context::get(
            source,
            width,
            height,
            destination,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(EncodeError::Converter)?;

        Ok(Self {
            context,
            width,
            height,
        })
    }

    /// Resamples `source` into `destination`. Both images must match the
    /// dimensions the converter was built for.
    pub fn convert(
        &mut self,
        source: &ImageBuffer,
        destination: &mut ImageBuffer,
    ) -> Result<(), EncodeError> {
        if source.width() != self.width
            || source.height() != self.height
            || destination.width() != self.width
            || destination.height() != self.height
        {
            return Err(EncodeError::DimensionMismatch {
                src_width: source.width(),
                src_height: source.height(),
                dst_width: destination.width(),
                dst_height: destination.height(),
            });
        }

        self.context
            .run(source.frame(), destination.frame_mut())
            .map_err(EncodeError::Converter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> ImageBuffer {
        let mut image =
            ImageBuffer::new(ffmpeg_next::format::Pixel::RGB24, width, height, 1).unwrap();
        let stride = image.stride(0);
        let data = image.data_mut(0);
        for row in 0..height as usize {
            for col in 0..width as usize {
                let at = row * stride + 3 * col;
                data[at..at + 3].copy_from_slice(&rgb);
            }
        }
        image
    }

    #[test]
    fn test_red_converts_to_expected_yuv() {
        ffmpeg_next::init().unwrap();
        let source = solid_rgb(64, 64, [255, 0, 0]);
        let mut destination =
            ImageBuffer::new(ffmpeg_next::format::Pixel::YUV420P, 64, 64, 4).unwrap();
        let mut converter = PixelConverter::new(
            ffmpeg_next::format::Pixel::RGB24,
            ffmpeg_next::format::Pixel::YUV420P,
            64,
            64,
        )
        .unwrap();

        converter.convert(&source, &mut destination).unwrap();

        // BT.601 limited range puts pure red around Y=81, Cb=90, Cr=240.
        let y = destination.data(0)[0] as i32;
        let u = destination.data(1)[0] as i32;
        let v = destination.data(2)[0] as i32;
        assert!((y - 81).abs() <= 6, "luma {y} too far from 81");
        assert!((u - 90).abs() <= 6, "Cb {u} too far from 90");
        assert!((v - 240).abs() <= 6, "Cr {v} too far from 240");
    }

    #[test]
    fn test_mismatched_dimensions_are_rejected() {
        ffmpeg_next::init().unwrap();
        let source = solid_rgb(32, 32, [0, 0, 0]);
        let mut destination =
            ImageBuffer::new(ffmpeg_next::format::Pixel::YUV420P, 64, 64, 4).unwrap();
        let mut converter = PixelConverter::new(
            ffmpeg_next::format::Pixel::RGB24,
            ffmpeg_next::format::Pixel::YUV420P,
            64,
            64,
        )
        .unwrap();

        let result = converter.convert(&source, &mut destination);

        assert!(matches!(result, Err(EncodeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_converter_is_reusable_across_frames() {
        ffmpeg_next::init().unwrap();
        let mut converter = PixelConverter::new(
            ffmpeg_next::format::Pixel::RGB24,
            ffmpeg_next::format::Pixel::YUV420P,
            64,
            64,
        )
        .unwrap();
        let mut destination =
            ImageBuffer::new(ffmpeg_next::format::Pixel::YUV420P, 64, 64, 4).unwrap();

        for value in [0u8, 128, 255] {
            let source = solid_rgb(64, 64, [value, value, value]);
            converter.convert(&source, &mut destination).unwrap();
            let y = destination.data(0)[0] as i32;
            // Grey maps to luma alone; scale into the 16..235 range.
            let expected = 16 + (value as i32 * 219) / 255;
            assert!((y - expected).abs() <= 6, "luma {y} vs {expected}");
        }
    }
}
