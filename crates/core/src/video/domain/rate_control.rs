/// Rate-control policy for the video encoder: how the codec trades bitrate
/// for quality, or — for GIF — a fixed reduced palette.
///
/// Applied through a two-step protocol around encoder→stream parameter
/// propagation. Some knobs only take effect on the unopened codec context
/// (bit rate, pixel format, private options passed to open), while others
/// must override stream parameters that propagation itself computes, so a
/// single hook cannot express both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateControl {
    /// Target an average bitrate in bits per second.
    ConstantBitrate { bitrate: u64 },
    /// Constant rate factor; lower is higher quality on a codec-defined
    /// scale (0–51 for the H.264/H.265 families).
    ConstantQuality { crf: u32 },
    /// Reduced-palette animated GIF output.
    PaletteGif,
}

impl RateControl {
    /// Destination pixel format this policy demands from the converter and
    /// the codec.
    pub fn pixel_format(&self) -> ffmpeg_next::format::Pixel {
        match self {
            RateControl::PaletteGif => ffmpeg_next::format::Pixel::RGB8,
            _ => ffmpeg_next::format::Pixel::YUV420P,
        }
    }

    /// First step: runs on the still-unopened codec context, before its
    /// parameters are propagated onto the output stream.
    pub fn before_propagation(
        &self,
        context: &mut ffmpeg_next::codec::encoder::video::Video,
        options: &mut ffmpeg_next::Dictionary<'_>,
    ) {
        match self {
            RateControl::ConstantBitrate { bitrate } => {
                context.set_bit_rate(*bitrate as usize);
            }
            RateControl::ConstantQuality { crf } => {
                options.set("crf", &crf.to_string());
            }
            RateControl::PaletteGif => {
                context.set_format(ffmpeg_next::format::Pixel::RGB8);
            }
        }
    }

    /// Second step: runs after the opened encoder's parameters were copied
    /// onto the stream, and may override fields that copy computed.
    pub fn after_propagation(&self, stream: &mut ffmpeg_next::format::stream::StreamMut<'_>) {
        match self {
            RateControl::ConstantBitrate { bitrate } => {
                // Safety: `parameters` wraps the stream's live codecpar;
                // the stream is borrowed mutably for the duration.
                unsafe {
                    (*stream.parameters().as_mut_ptr()).bit_rate = *bitrate as i64;
                }
            }
            RateControl::ConstantQuality { .. } => {}
            RateControl::PaletteGif => {
                // Safety: as above.
                unsafe {
                    (*stream.parameters().as_mut_ptr()).format =
                        ffmpeg_next::ffi::AVPixelFormat::from(ffmpeg_next::format::Pixel::RGB8)
                            as i32;
                }
            }
        }
    }
}
