use std::path::PathBuf;
use std::process;

use clap::Parser;

use rastervid_core::video::domain::encode_logger::LogEncodeLogger;
use rastervid_core::video::domain::frame_sink::FrameSink;
use rastervid_core::video::infrastructure::video_encoder::VideoEncoder;

/// Renders a procedural test animation and encodes it to a video file.
#[derive(Parser)]
#[command(name = "rastervid")]
struct Cli {
    /// Output file; the container is chosen from the extension.
    output: PathBuf,

    /// Frame width in pixels.
    #[arg(long, default_value = "640")]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value = "360")]
    height: u32,

    /// Frames per second.
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Animation length in seconds.
    #[arg(long, default_value = "5")]
    seconds: u32,

    /// Target bitrate in bits per second (constant-bitrate mode).
    #[arg(long, conflicts_with_all = ["crf", "gif"])]
    bitrate: Option<u64>,

    /// Constant rate factor (0 = lossless, 51 = worst, default 23).
    #[arg(long, conflicts_with = "gif")]
    crf: Option<u32>,

    /// Write a reduced-palette animated GIF instead of a video.
    #[arg(long)]
    gif: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The library never touches ffmpeg's process-wide verbosity; quiet the
    // native logs here, at the application layer.
    ffmpeg_next::log::set_level(ffmpeg_next::log::Level::Quiet);

    let mut encoder = if cli.gif {
        VideoEncoder::palette_gif(&cli.output, cli.width, cli.height, cli.fps)
    } else if let Some(bitrate) = cli.bitrate {
        VideoEncoder::constant_bitrate(&cli.output, cli.width, cli.height, cli.fps, bitrate)
    } else {
        VideoEncoder::constant_quality(
            &cli.output,
            cli.width,
            cli.height,
            cli.fps,
            cli.crf.unwrap_or(23),
        )
    }
    .with_logger(Box::new(LogEncodeLogger));

    render_animation(&mut encoder, cli.width, cli.height, cli.fps.max(1), cli.seconds)?;

    println!(
        "{} frames -> {}",
        encoder.frames_count(),
        encoder.output_path().display()
    );
    Ok(())
}

/// Renders the animation into any frame sink; the rendering side only
/// knows how to fill RGB buffers.
fn render_animation(
    sink: &mut dyn FrameSink,
    width: u32,
    height: u32,
    fps: u32,
    seconds: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let frames = fps * seconds;
    let mut rgb = vec![0u8; 3 * width as usize * height as usize];
    for frame in 0..frames {
        render_pattern(&mut rgb, width, height, frame as f32 / fps as f32);
        sink.append_frame(&rgb)?;
        if (frame + 1) % fps == 0 {
            log::debug!("encoded {}s of {}s", (frame + 1) / fps, seconds);
        }
    }
    sink.finish()?;
    Ok(())
}

/// Fills `rgb` with a drifting color pattern. Row 0 is the bottom of the
/// image, matching the orientation the encoder expects from a GL readback.
fn render_pattern(rgb: &mut [u8], width: u32, height: u32, t: f32) {
    use std::f32::consts::TAU;

    let width = width as usize;
    let height = height as usize;
    for row in 0..height {
        let y = (height - 1 - row) as f32 / height as f32;
        for col in 0..width {
            let x = col as f32 / width as f32;
            let at = 3 * (row * width + col);
            rgb[at] = channel((TAU * (x + 0.25 * t)).sin());
            rgb[at + 1] = channel((TAU * (y + 0.17 * t)).cos());
            rgb[at + 2] = channel((TAU * (x * y + 0.11 * t)).sin());
        }
    }
}

fn channel(wave: f32) -> u8 {
    (255.0 * (0.5 + 0.5 * wave)) as u8
}
