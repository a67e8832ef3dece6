use std::time::Duration;

use super::request::{SpectrogramRequest, SpectrogramTile};
use super::transform::TransformProvider;
use crate::settings::{AnalyzeSettingsSnapshot, AnalyzeToken};

/// Samples covered by one request before rounding up to whole hops.
pub const DEFAULT_CHUNK_SAMPLES: usize = 10_000;

/// Streams spectrogram tiles for the visible window, one chunk at a time.
///
/// Only one generation is live at a time. Tiles from any other generation
/// are dropped on arrival, and the next chunk of a channel is only
/// requested once the previous chunk of the live generation came back, so
/// each channel is filled in increasing sample order.
///
/// The next chunk is held back until the following `poll`, so one poll
/// yields at most one tile per channel even when the provider answers
/// synchronously.
pub struct SpectrogramPipeline {
    provider: Option<Box<dyn TransformProvider>>,
    channel_count: usize,
    chunk_samples: usize,
    token: Option<AnalyzeToken>,
    outstanding: usize,
    deferred: Vec<SpectrogramRequest>,
    stale_dropped: usize,
}

impl SpectrogramPipeline {
    pub fn new(provider: Option<Box<dyn TransformProvider>>, channel_count: usize) -> Self {
        Self {
            provider,
            channel_count,
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
            token: None,
            outstanding: 0,
            deferred: Vec::new(),
            stale_dropped: 0,
        }
    }

    pub fn with_chunk_samples(mut self, chunk_samples: usize) -> Self {
        self.chunk_samples = chunk_samples.max(1);
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Make `token` the live generation. Work for earlier tokens is
    /// forgotten and its results will be dropped.
    pub fn set_token(&mut self, token: AnalyzeToken) {
        self.token = Some(token);
        self.outstanding = 0;
        self.deferred.clear();
        if let Some(provider) = self.provider.as_mut() {
            provider.set_current_token(token);
        }
    }

    pub fn token(&self) -> Option<AnalyzeToken> {
        self.token
    }

    /// No live request is waiting for a result or to be sent.
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0 && self.deferred.is_empty()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Tiles dropped because their generation was no longer live.
    pub fn stale_dropped(&self) -> usize {
        self.stale_dropped
    }

    /// End of the chunk starting at `start`: a whole number of hops, at
    /// least one, never past the visible window.
    pub fn chunk_end(&self, start: usize, settings: &AnalyzeSettingsSnapshot) -> usize {
        let hop = settings.hop_size.max(1);
        let span = self.chunk_samples.div_ceil(hop) * hop;
        (start + span).min(settings.end_sample())
    }

    /// Request the first chunk of `channel`'s visible window.
    pub fn start_channel(&mut self, channel: usize, settings: &AnalyzeSettingsSnapshot) -> bool {
        let start = settings.start_sample();
        let end = self.chunk_end(start, settings);
        self.request_tile(channel, start, end, settings, settings.token)
    }

    /// Issue one request. Returns false, and requests nothing, when the
    /// token is not live, the channel does not exist, the range is empty or
    /// no provider is available.
    pub fn request_tile(
        &mut self,
        channel: usize,
        sample_start: usize,
        sample_end: usize,
        settings: &AnalyzeSettingsSnapshot,
        token: AnalyzeToken,
    ) -> bool {
        if self.token != Some(token) {
            log::debug!("Not requesting ch{} for stale token", channel);
            return false;
        }
        if channel >= self.channel_count {
            log::debug!("Channel {} out of range ({} channels)", channel, self.channel_count);
            return false;
        }
        if sample_start >= sample_end {
            return false;
        }
        if self.provider.is_none() {
            log::debug!("No transform provider, spectrogram stays empty");
            return false;
        }

        self.submit(SpectrogramRequest {
            channel,
            sample_start,
            sample_end,
            settings: settings.clone(),
            token,
        })
    }

    fn submit(&mut self, request: SpectrogramRequest) -> bool {
        let Some(provider) = self.provider.as_mut() else {
            return false;
        };
        let channel = request.channel;
        match provider.submit(request) {
            Ok(()) => {
                self.outstanding += 1;
                true
            }
            Err(err) => {
                log::warn!("Spectrogram request ch{} failed: {}", channel, err);
                false
            }
        }
    }

    /// Send the chunks held back by the previous poll, then collect every
    /// tile that is ready now.
    pub fn poll(&mut self) -> Vec<SpectrogramTile> {
        self.send_deferred();
        self.collect_ready()
    }

    /// Like `poll`, but block up to `timeout` for the first result.
    pub fn wait(&mut self, timeout: Duration) -> Vec<SpectrogramTile> {
        self.send_deferred();
        let first = self.provider.as_mut().and_then(|p| p.wait(timeout));
        let mut accepted: Vec<SpectrogramTile> = first.and_then(|t| self.accept(t)).into_iter().collect();
        accepted.extend(self.collect_ready());
        accepted
    }

    fn send_deferred(&mut self) {
        for request in std::mem::take(&mut self.deferred) {
            if self.token == Some(request.token) {
                self.submit(request);
            }
        }
    }

    fn collect_ready(&mut self) -> Vec<SpectrogramTile> {
        let mut accepted = Vec::new();
        loop {
            let Some(tile) = self.provider.as_mut().and_then(|p| p.poll()) else {
                break;
            };
            if let Some(tile) = self.accept(tile) {
                accepted.push(tile);
            }
        }
        accepted
    }

    fn accept(&mut self, tile: SpectrogramTile) -> Option<SpectrogramTile> {
        if self.token != Some(tile.token) {
            self.stale_dropped += 1;
            log::debug!(
                "Dropping stale tile ch{} {}..{}",
                tile.channel,
                tile.sample_start,
                tile.sample_end
            );
            return None;
        }
        self.outstanding = self.outstanding.saturating_sub(1);

        if tile.sample_end < tile.settings.end_sample() {
            let next_end = self.chunk_end(tile.sample_end, &tile.settings);
            self.deferred.push(SpectrogramRequest {
                channel: tile.channel,
                sample_start: tile.sample_end,
                sample_end: next_end,
                settings: tile.settings.clone(),
                token: tile.token,
            });
        }
        Some(tile)
    }
}
