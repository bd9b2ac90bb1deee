//! hlspack CLI - package MOV/MP4 files into an HLS presentation.

use clap::Parser;
use hlspack_hls::packager::{DEFAULT_MASTER_PLAYLIST, DEFAULT_SEGMENT_DURATION};
use hlspack_hls::{package, PackagerConfig};
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for the hlspack tool.
#[derive(Parser, Debug)]
#[command(name = "hlspack")]
#[command(version)]
#[command(about = "MOV/MP4 to HLS stream packager")]
#[command(long_about = "Packages one or more MOV/MP4 renditions of the same content \n\
    into an HLS version 3 presentation: MPEG-2 TS segments, one media \n\
    playlist per rendition, and a master playlist.\n\n\
    Segment boundaries are aligned across renditions at common video \n\
    sync frames so a player can switch variants at any segment edge.\n\n\
    EXAMPLES:\n    \
    hlspack -i movie.mp4 -o out\n    \
    hlspack -i movie-1080.mp4,movie-720.mp4,movie-480.mp4 -o out\n    \
    hlspack -i movie.mp4 -o out --segment-duration 4")]
struct Args {
    /// Input files, separated by commas, e.g. 1.mp4,2.mp4,3.mp4
    #[arg(short, long, value_delimiter = ',', required = true)]
    input_files: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Target segment duration in seconds
    #[arg(long, default_value_t = DEFAULT_SEGMENT_DURATION)]
    segment_duration: f64,

    /// Master playlist filename
    #[arg(long, default_value = DEFAULT_MASTER_PLAYLIST)]
    master_playlist: String,

    /// Be verbose
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let config = PackagerConfig {
        input_files: args.input_files,
        output_dir: args.output_dir,
        segment_duration: args.segment_duration,
        master_playlist_name: args.master_playlist,
    };

    let stats = package(&config)?;
    for (index, rendition) in stats.iter().enumerate() {
        info!(
            rendition = index,
            segments = rendition.segment_count(),
            bytes = rendition.total_bytes(),
            bandwidth = rendition.bandwidth(),
            codecs = %rendition.codecs,
            "rendition packaged"
        );
    }

    Ok(())
}
