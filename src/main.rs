mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cli::{AnalyzeArgs, Cli, Command, PlayArgs};
use wavpeek::audio::{decode::decode_file, AudioBuffer};
use wavpeek::config::{find_config, load_config, AnalyzeDefault, Config};
use wavpeek::render::{Analyzer, FigureLog, RecordingFactory};
use wavpeek::session::{load_from_host, LocalHost};
use wavpeek::settings::{window_size_index, AnalyzeSettingsSnapshot, SettingsStore};
use wavpeek::spectrogram::{FftProvider, TransformProvider, WorkerProvider};
use wavpeek::transport::{PlayerService, SystemClock, TickOutcome};

const MAX_TURNS: usize = 100_000;
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Serialize)]
struct AnalysisReport {
    input: String,
    format_tag: String,
    sample_rate: f64,
    channel_count: usize,
    duration: f64,
    settings: AnalyzeSettingsSnapshot,
    turns: usize,
    complete: bool,
    stale_tiles_dropped: usize,
    figures: Vec<FigureLog>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match find_config(cli.config.as_deref()) {
        Some(path) => match load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Command::Analyze(args) => run_analyze(args, &config),
        Command::Play(args) => run_play(args, &config),
    }
}

/// Decode with symphonia, then hand the samples to the engine through the
/// host handshake. Returns the buffer, the codec name and whether the host
/// asked for an immediate analysis.
fn load(input: &Path, auto_analyze: bool) -> Result<(AudioBuffer, String, bool)> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    log::info!("Decoding {}", input.display());
    let (decoded, info) = decode_file(input)?;
    let host = LocalHost::new(&decoded, &info.format_tag, info.chunk_size, auto_analyze);
    let (buffer, auto_analyze) = load_from_host(&host).context("Host handshake failed")?;
    Ok((buffer, info.format_tag, auto_analyze))
}

fn run_analyze(args: AnalyzeArgs, config: &Config) -> Result<()> {
    // the report is the point of this command, so it always analyzes
    let (buffer, format_tag, _) = load(&args.input, true)?;

    // CLI values win over the config file
    let mut defaults: AnalyzeDefault = config.analyze.clone();
    if let Some(size) = args.window_size {
        defaults.window_size_index = window_size_index(size);
        if defaults.window_size_index.is_none() {
            log::warn!("Unsupported window size {}, using the default", size);
        }
    }
    defaults.min_frequency = args.min_freq.or(defaults.min_frequency);
    defaults.max_frequency = args.max_freq.or(defaults.max_frequency);
    defaults.min_amplitude = args.min_amp.or(defaults.min_amplitude);
    defaults.max_amplitude = args.max_amp.or(defaults.max_amplitude);
    defaults.spectrogram_db_floor = args.db_floor.or(defaults.spectrogram_db_floor);
    defaults.frequency_scale = args.scale.or(defaults.frequency_scale);
    defaults.mel_filter_count = args.mel_filters.or(defaults.mel_filter_count);

    let mut settings = SettingsStore::from_default_setting(&defaults, &buffer);
    if let Some(t) = args.min_time {
        settings.set_min_time(t);
    }
    if let Some(t) = args.max_time {
        settings.set_max_time(t);
    }
    if let Some(hop) = args.hop_size {
        settings.set_hop_size(hop);
    }

    let buffer = Arc::new(buffer);
    let provider: Box<dyn TransformProvider> = if args.worker {
        Box::new(WorkerProvider::spawn(Arc::clone(&buffer))?)
    } else {
        Box::new(FftProvider::new(Arc::clone(&buffer)))
    };

    let mut analyzer = Analyzer::new(
        Arc::clone(&buffer),
        settings,
        Some(provider),
        RecordingFactory::new(),
    );
    analyzer.analyze();
    let turns = analyzer.run_until_idle(MAX_TURNS);
    let complete = analyzer.is_idle();
    if !complete {
        log::warn!("Analysis still running after {} turns", turns);
    }

    let report = AnalysisReport {
        input: args.input.display().to_string(),
        format_tag,
        sample_rate: buffer.sample_rate(),
        channel_count: buffer.channel_count(),
        duration: buffer.duration(),
        settings: analyzer.settings().snapshot(),
        turns,
        complete,
        stale_tiles_dropped: analyzer.pipeline().stale_dropped(),
        figures: analyzer.factory().live(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_play(args: PlayArgs, config: &Config) -> Result<()> {
    let (buffer, _format_tag, auto_analyze) = load(&args.input, config.player.auto_analyze)?;
    let duration = buffer.duration();

    let mut settings = SettingsStore::from_default_setting(&config.analyze, &buffer);
    if let Some(t) = args.min_time {
        settings.set_min_time(t);
    }
    if let Some(t) = args.max_time {
        settings.set_max_time(t);
    }

    let mut player = PlayerService::new(SystemClock::new(), duration);
    player.set_volume(config.player.volume);
    player.set_seek_to_play(config.player.seek_to_play);

    let mut analyzer = Analyzer::new(Arc::new(buffer), settings, None, RecordingFactory::new());
    analyzer.attach_transport(player.subscribe());
    analyzer.activate(auto_analyze);

    if let Some(seek) = args.seek {
        player.on_seek_input(seek);
    }
    player.play();

    let pb = ProgressBar::new((duration * 1000.0) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("=>-"),
    );

    loop {
        let outcome = player.tick();
        analyzer.run_turn();
        let overlay = analyzer.overlay().map_or(0.0, |o| o.position_percent());
        pb.set_position((player.position() * 1000.0) as u64);
        pb.set_message(format!(
            "{:.2}s / {:.2}s  window {:.1}%",
            player.position(),
            duration,
            overlay
        ));
        if outcome != TickOutcome::Continue {
            break;
        }
        std::thread::sleep(FRAME_INTERVAL);
    }

    pb.finish_with_message("Playback finished");
    Ok(())
}
