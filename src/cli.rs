use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use wavpeek::settings::FrequencyScale;

#[derive(Parser, Debug)]
#[command(name = "wavpeek", about = "Audio waveform and spectrogram previewer")]
pub struct Cli {
    /// Config file (defaults to wavpeek.toml, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a file headlessly and write a JSON report
    Analyze(AnalyzeArgs),
    /// Follow playback of a file in real time
    Play(PlayArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// FFT window size (256 to 32768, power of two)
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Pin the hop size instead of deriving it from the window
    #[arg(long)]
    pub hop_size: Option<usize>,

    #[arg(long)]
    pub min_freq: Option<f64>,

    #[arg(long)]
    pub max_freq: Option<f64>,

    #[arg(long)]
    pub min_time: Option<f64>,

    #[arg(long)]
    pub max_time: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub min_amp: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub max_amp: Option<f64>,

    /// Spectrogram dB floor (-1000 to 0)
    #[arg(long, allow_hyphen_values = true)]
    pub db_floor: Option<f64>,

    /// Frequency axis scale
    #[arg(long, value_enum)]
    pub scale: Option<FrequencyScale>,

    /// Mel filter count (20 to 200)
    #[arg(long)]
    pub mel_filters: Option<f64>,

    /// Compute spectrograms on a background thread
    #[arg(long)]
    pub worker: bool,

    /// Report file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// Start position in percent of the file
    #[arg(long)]
    pub seek: Option<f64>,

    /// Visible window start for the overlay, in seconds
    #[arg(long)]
    pub min_time: Option<f64>,

    /// Visible window end for the overlay, in seconds
    #[arg(long)]
    pub max_time: Option<f64>,
}
