use crossbeam::channel::{self, Receiver, Sender};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::request::{SpectrogramRequest, SpectrogramTile};
use super::scale::{normalize_db, FrequencyBins};
use crate::audio::AudioBuffer;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{EngineMessage, HostMessage};
use crate::settings::AnalyzeToken;

/// Something that turns spectrogram requests into tiles.
///
/// Requests are fire-and-forget: results come back later through
/// [`poll`](TransformProvider::poll) and are matched by token, never by
/// request identity.
pub trait TransformProvider {
    fn submit(&mut self, request: SpectrogramRequest) -> EngineResult<()>;

    /// Next finished tile, if any, without blocking.
    fn poll(&mut self) -> Option<SpectrogramTile>;

    /// Like `poll`, but may block up to `timeout` for a result.
    fn wait(&mut self, _timeout: Duration) -> Option<SpectrogramTile> {
        self.poll()
    }

    /// Tell the provider which generation is live so it can skip stale work.
    fn set_current_token(&mut self, _token: AnalyzeToken) {}
}

/// Compute one tile from a channel of `buffer`.
///
/// Frames start every `hop_size` samples from `sample_start` until
/// `sample_end`; windows running past the buffer are zero padded. Returns
/// `None` when the channel does not exist.
pub fn compute_tile(buffer: &AudioBuffer, request: &SpectrogramRequest) -> Option<SpectrogramTile> {
    let samples = buffer.channel(request.channel)?;
    let settings = &request.settings;
    let window_size = settings.window_size.max(2);
    let hop = settings.hop_size.max(1);
    let span = request.sample_end.saturating_sub(request.sample_start);
    let frame_count = span.div_ceil(hop);

    let bins = FrequencyBins::new(settings);
    let window = hann_window(window_size);
    // Scale so a full-scale sine peaks at 0 dB
    let gain = 2.0 / window.iter().sum::<f32>().max(f32::EPSILON);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);

    let magnitude_frames: Vec<Vec<f32>> = (0..frame_count)
        .into_par_iter()
        .map(|i| {
            let start = request.sample_start + i * hop;
            let mut fft_input: Vec<Complex<f32>> = window
                .iter()
                .enumerate()
                .map(|(j, &w)| Complex::new(samples.get(start + j).copied().unwrap_or(0.0) * w, 0.0))
                .collect();
            fft.process(&mut fft_input);

            let spectrum: Vec<f32> = fft_input[..=window_size / 2]
                .iter()
                .map(|c| c.norm() * gain)
                .collect();

            bins.project(&spectrum)
                .into_iter()
                .map(|a| normalize_db(a, settings.spectrogram_db_floor))
                .collect()
        })
        .collect();

    Some(SpectrogramTile {
        channel: request.channel,
        sample_start: request.sample_start,
        sample_end: request.sample_end,
        settings: request.settings.clone(),
        token: request.token,
        magnitude_frames,
    })
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

/// Computes tiles on the caller's thread at submit time; results are
/// handed out on the next poll.
pub struct FftProvider {
    buffer: Arc<AudioBuffer>,
    ready: VecDeque<SpectrogramTile>,
}

impl FftProvider {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            buffer,
            ready: VecDeque::new(),
        }
    }
}

impl TransformProvider for FftProvider {
    fn submit(&mut self, request: SpectrogramRequest) -> EngineResult<()> {
        let tile = compute_tile(&self.buffer, &request).ok_or(EngineError::ChannelOutOfRange {
            channel: request.channel,
            channel_count: self.buffer.channel_count(),
        })?;
        self.ready.push_back(tile);
        Ok(())
    }

    fn poll(&mut self) -> Option<SpectrogramTile> {
        self.ready.pop_front()
    }
}

/// Computes tiles on a background thread.
///
/// Requests and results cross the thread boundary as `spectrogram` wire
/// messages, so the worker side is the same as an out-of-process provider.
/// Requests whose token is no longer current are skipped before any FFT
/// work is done.
pub struct WorkerProvider {
    requests: Option<Sender<String>>,
    results: Receiver<String>,
    current: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerProvider {
    pub fn spawn(buffer: Arc<AudioBuffer>) -> EngineResult<Self> {
        let (request_tx, request_rx) = channel::unbounded::<String>();
        let (result_tx, result_rx) = channel::unbounded::<String>();
        let current = Arc::new(AtomicU64::new(0));
        let live = Arc::clone(&current);

        let handle = std::thread::Builder::new()
            .name("spectrogram-worker".into())
            .spawn(move || {
                for text in request_rx.iter() {
                    let request = match EngineMessage::from_json(&text).map(EngineMessage::into_request) {
                        Ok(Some(request)) => request,
                        Ok(None) => continue,
                        Err(err) => {
                            log::warn!("Worker ignored message: {}", err);
                            continue;
                        }
                    };
                    let token = live.load(Ordering::Acquire);
                    if token != 0 && request.token.as_u64() != token {
                        log::debug!(
                            "Skipping stale request ch{} {}..{}",
                            request.channel,
                            request.sample_start,
                            request.sample_end
                        );
                        continue;
                    }
                    let Some(tile) = compute_tile(&buffer, &request) else {
                        log::warn!("Dropping request for missing channel {}", request.channel);
                        continue;
                    };
                    let response = match HostMessage::from(tile).to_json() {
                        Ok(response) => response,
                        Err(err) => {
                            log::warn!("Worker could not encode a tile: {}", err);
                            continue;
                        }
                    };
                    if result_tx.send(response).is_err() {
                        break;
                    }
                }
                log::debug!("Spectrogram worker stopped");
            })
            .map_err(|_| EngineError::ProviderUnavailable)?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            current,
            handle: Some(handle),
        })
    }
}

fn decode_response(text: String) -> Option<SpectrogramTile> {
    match HostMessage::from_json(&text) {
        Ok(message) => message.into_tile(),
        Err(err) => {
            log::warn!("Unreadable spectrogram response: {}", err);
            None
        }
    }
}

impl TransformProvider for WorkerProvider {
    fn submit(&mut self, request: SpectrogramRequest) -> EngineResult<()> {
        let tx = self.requests.as_ref().ok_or(EngineError::ProviderUnavailable)?;
        let text = EngineMessage::from(&request).to_json()?;
        tx.send(text).map_err(|_| EngineError::ProviderUnavailable)
    }

    fn poll(&mut self) -> Option<SpectrogramTile> {
        self.results.try_recv().ok().and_then(decode_response)
    }

    fn wait(&mut self, timeout: Duration) -> Option<SpectrogramTile> {
        self.results.recv_timeout(timeout).ok().and_then(decode_response)
    }

    fn set_current_token(&mut self, token: AnalyzeToken) {
        self.current.store(token.as_u64(), Ordering::Release);
    }
}

impl Drop for WorkerProvider {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        drop(self.requests.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
