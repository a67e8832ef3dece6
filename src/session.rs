//! Engine side of the host handshake.
//!
//! ```text
//! engine: ready            host: info
//! engine: prepare          host: prepare { data }
//! engine: play {0, n}      host: data {..}
//! engine: play {n, 2n}     host: data {..}      until end >= whole_length
//! ```

use crate::audio::AudioBuffer;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{DataChunk, EngineMessage, HostMessage, PrepareData, DATA_CHUNK_SAMPLES};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Idle,
    AwaitingInfo,
    AwaitingPrepare,
    Loading,
    Loaded,
    /// The host could not provide audio; everything but `reload` is ignored
    Failed,
}

/// What the caller should do after a host message.
#[derive(Debug)]
pub enum SessionStep {
    Send(EngineMessage),
    Loaded {
        buffer: AudioBuffer,
        auto_analyze: bool,
    },
    Failed,
    Nothing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FileInfo {
    pub format_tag: String,
    pub chunk_size: usize,
    pub is_trusted: bool,
}

pub struct HostSession {
    state: SessionState,
    info: Option<FileInfo>,
    prepare: Option<PrepareData>,
    channels: Vec<Vec<f32>>,
    received: usize,
    chunk_samples: usize,
}

impl Default for HostSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            info: None,
            prepare: None,
            channels: Vec::new(),
            received: 0,
            chunk_samples: DATA_CHUNK_SAMPLES,
        }
    }

    pub fn with_chunk_samples(mut self, chunk_samples: usize) -> Self {
        self.chunk_samples = chunk_samples.max(1);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn info(&self) -> Option<&FileInfo> {
        self.info.as_ref()
    }

    /// Samples per channel received so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Begin the handshake; the returned message goes to the host.
    pub fn start(&mut self) -> EngineMessage {
        self.info = None;
        self.prepare = None;
        self.channels.clear();
        self.received = 0;
        self.state = SessionState::AwaitingInfo;
        EngineMessage::Ready
    }

    pub fn handle(&mut self, message: HostMessage) -> EngineResult<SessionStep> {
        if let HostMessage::Reload = message {
            log::info!("Host reloaded the document, restarting handshake");
            return Ok(SessionStep::Send(self.start()));
        }
        if self.state == SessionState::Failed {
            return Ok(SessionStep::Nothing);
        }

        match (self.state.clone(), message) {
            (
                SessionState::AwaitingInfo,
                HostMessage::Info {
                    format_tag,
                    chunk_size,
                    is_trusted,
                },
            ) => {
                log::debug!("Host info: format={} size={}", format_tag, chunk_size);
                self.info = Some(FileInfo {
                    format_tag,
                    chunk_size,
                    is_trusted,
                });
                self.state = SessionState::AwaitingPrepare;
                Ok(SessionStep::Send(EngineMessage::Prepare))
            }
            (SessionState::AwaitingPrepare, HostMessage::Prepare { data }) => {
                let Some(data) = data.filter(|d| d.channel_count > 0 && d.length > 0) else {
                    log::warn!("Host could not decode the document");
                    self.state = SessionState::Failed;
                    return Ok(SessionStep::Failed);
                };
                log::info!(
                    "Loading {} channel(s), {} samples at {} Hz",
                    data.channel_count,
                    data.length,
                    data.sample_rate
                );
                self.channels = vec![vec![0.0; data.length]; data.channel_count];
                self.received = 0;
                let end = self.chunk_samples.min(data.length);
                self.prepare = Some(data);
                self.state = SessionState::Loading;
                Ok(SessionStep::Send(EngineMessage::Play { start: 0, end }))
            }
            (SessionState::Loading, HostMessage::Data { data }) => self.accept_chunk(data),
            (state, other) => Err(EngineError::Protocol(format!(
                "unexpected {} while {:?}",
                message_name(&other),
                state
            ))),
        }
    }

    fn accept_chunk(&mut self, chunk: DataChunk) -> EngineResult<SessionStep> {
        let Some(prepare) = self.prepare.as_ref() else {
            return Err(EngineError::Protocol("data before prepare".into()));
        };
        if chunk.channel_count != self.channels.len() || chunk.samples.len() != self.channels.len() {
            return Err(EngineError::Protocol(format!(
                "chunk has {} channel(s), expected {}",
                chunk.samples.len(),
                self.channels.len()
            )));
        }
        if chunk.start > chunk.end || chunk.end > prepare.length {
            return Err(EngineError::Protocol(format!(
                "chunk {}..{} outside {} samples",
                chunk.start, chunk.end, prepare.length
            )));
        }
        let span = chunk.end - chunk.start;
        if chunk.samples.iter().any(|s| s.len() != span) {
            return Err(EngineError::Protocol("chunk length mismatch".into()));
        }

        for (target, source) in self.channels.iter_mut().zip(&chunk.samples) {
            target[chunk.start..chunk.end].copy_from_slice(source);
        }
        self.received = self.received.max(chunk.end);

        let whole = chunk.whole_length.min(prepare.length);
        if chunk.end >= whole {
            let sample_rate = prepare.sample_rate;
            let channels = std::mem::take(&mut self.channels);
            let buffer = AudioBuffer::new(channels, sample_rate)?;
            self.state = SessionState::Loaded;
            log::info!("Loaded {:.2}s of audio", buffer.duration());
            return Ok(SessionStep::Loaded {
                buffer,
                auto_analyze: chunk.auto_analyze,
            });
        }

        let end = (chunk.end + self.chunk_samples).min(whole);
        Ok(SessionStep::Send(EngineMessage::Play {
            start: chunk.end,
            end,
        }))
    }
}

fn message_name(message: &HostMessage) -> &'static str {
    match message {
        HostMessage::Info { .. } => "info",
        HostMessage::Prepare { .. } => "prepare",
        HostMessage::Data { .. } => "data",
        HostMessage::Reload => "reload",
        HostMessage::Spectrogram { .. } => "spectrogram",
    }
}

/// Host that answers from a buffer already in memory.
pub struct LocalHost<'a> {
    buffer: &'a AudioBuffer,
    info: FileInfo,
    auto_analyze: bool,
}

impl<'a> LocalHost<'a> {
    pub fn new(buffer: &'a AudioBuffer, format_tag: &str, chunk_size: usize, auto_analyze: bool) -> Self {
        Self {
            buffer,
            info: FileInfo {
                format_tag: format_tag.to_string(),
                chunk_size,
                is_trusted: true,
            },
            auto_analyze,
        }
    }

    pub fn respond(&self, message: &EngineMessage) -> Option<HostMessage> {
        match message {
            EngineMessage::Ready => Some(HostMessage::Info {
                format_tag: self.info.format_tag.clone(),
                chunk_size: self.info.chunk_size,
                is_trusted: self.info.is_trusted,
            }),
            EngineMessage::Prepare => Some(HostMessage::Prepare {
                data: Some(PrepareData {
                    sample_rate: self.buffer.sample_rate(),
                    channel_count: self.buffer.channel_count(),
                    length: self.buffer.len(),
                    duration: self.buffer.duration(),
                }),
            }),
            EngineMessage::Play { start, end } => {
                let end = (*end).min(self.buffer.len());
                let start = (*start).min(end);
                let samples: Vec<Vec<f32>> = (0..self.buffer.channel_count())
                    .filter_map(|ch| self.buffer.channel(ch).map(|s| s[start..end].to_vec()))
                    .collect();
                Some(HostMessage::Data {
                    data: DataChunk {
                        samples,
                        length: end - start,
                        channel_count: self.buffer.channel_count(),
                        start,
                        end,
                        whole_length: self.buffer.len(),
                        auto_analyze: self.auto_analyze,
                    },
                })
            }
            EngineMessage::Spectrogram { .. } => None,
        }
    }
}

/// Run the whole handshake against `host`, passing every message through
/// its JSON form. Returns the assembled buffer and the auto-analyze flag.
pub fn load_from_host(host: &LocalHost<'_>) -> EngineResult<(AudioBuffer, bool)> {
    let mut session = HostSession::new();
    let mut outgoing = session.start();
    loop {
        let wire = outgoing.to_json()?;
        let request = EngineMessage::from_json(&wire)?;
        let reply = host
            .respond(&request)
            .ok_or_else(|| EngineError::Protocol("host did not answer".into()))?;
        let reply = HostMessage::from_json(&reply.to_json()?)?;

        match session.handle(reply)? {
            SessionStep::Send(next) => outgoing = next,
            SessionStep::Loaded {
                buffer,
                auto_analyze,
            } => return Ok((buffer, auto_analyze)),
            SessionStep::Failed => {
                return Err(EngineError::UnsupportedFormat("host could not decode".into()))
            }
            SessionStep::Nothing => {
                return Err(EngineError::Protocol("handshake stalled".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_buffer(len: usize) -> AudioBuffer {
        let left: Vec<f32> = (0..len).map(|i| i as f32 / len as f32).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        AudioBuffer::new(vec![left, right], 48000.0).unwrap()
    }

    #[test]
    fn handshake_pulls_data_in_chunks() {
        let source = ramp_buffer(250_000);
        let host = LocalHost::new(&source, "pcm_s16le", 1_000_044, true);
        let mut session = HostSession::new();

        let mut msg = session.start();
        assert_eq!(msg, EngineMessage::Ready);
        let mut plays = Vec::new();
        let loaded = loop {
            let reply = host.respond(&msg).unwrap();
            match session.handle(reply).unwrap() {
                SessionStep::Send(next) => {
                    if let EngineMessage::Play { start, end } = next {
                        plays.push((start, end));
                    }
                    msg = next;
                }
                SessionStep::Loaded { buffer, auto_analyze } => {
                    assert!(auto_analyze);
                    break buffer;
                }
                other => panic!("unexpected {:?}", other),
            }
        };

        assert_eq!(plays, vec![(0, 100_000), (100_000, 200_000), (200_000, 250_000)]);
        assert_eq!(session.state(), &SessionState::Loaded);
        assert_eq!(session.info().unwrap().format_tag, "pcm_s16le");
        assert_eq!(loaded.len(), 250_000);
        assert_eq!(loaded.channel(1), source.channel(1));
    }

    #[test]
    fn missing_prepare_payload_fails_inert() {
        let mut session = HostSession::new();
        session.start();
        session
            .handle(HostMessage::Info {
                format_tag: "mp3".into(),
                chunk_size: 10,
                is_trusted: false,
            })
            .unwrap();
        assert!(matches!(
            session.handle(HostMessage::Prepare { data: None }).unwrap(),
            SessionStep::Failed
        ));
        assert_eq!(session.state(), &SessionState::Failed);
        assert!(matches!(
            session.handle(HostMessage::Prepare { data: None }).unwrap(),
            SessionStep::Nothing
        ));

        // reload brings it back
        assert!(matches!(
            session.handle(HostMessage::Reload).unwrap(),
            SessionStep::Send(EngineMessage::Ready)
        ));
        assert_eq!(session.state(), &SessionState::AwaitingInfo);
    }

    #[test]
    fn out_of_order_message_is_rejected() {
        let mut session = HostSession::new();
        session.start();
        let err = session.handle(HostMessage::Prepare { data: None }).unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[test]
    fn load_round_trips_through_json() {
        let source = ramp_buffer(1000);
        let host = LocalHost::new(&source, "flac", 4000, false);
        let (buffer, auto_analyze) = load_from_host(&host).unwrap();
        assert!(!auto_analyze);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.channel(0), source.channel(0));
        assert_eq!(buffer.sample_rate(), 48000.0);
    }
}
