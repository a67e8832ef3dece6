//! Wire messages between the engine and its host.
//!
//! Every message is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::settings::AnalyzeSettingsSnapshot;
use crate::spectrogram::{SpectrogramRequest, SpectrogramTile};

/// Samples per channel pulled with one `play` message.
pub const DATA_CHUNK_SAMPLES: usize = 100_000;

/// Messages the engine sends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineMessage {
    Ready,
    Prepare,
    /// Ask for samples `start..end` of every channel
    Play { start: usize, end: usize },
    Spectrogram {
        channel: usize,
        start: usize,
        end: usize,
        settings: AnalyzeSettingsSnapshot,
    },
}

/// Messages the host sends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    Info {
        format_tag: String,
        chunk_size: usize,
        is_trusted: bool,
    },
    /// `data` is absent when the host could not decode the file
    Prepare { data: Option<PrepareData> },
    Data { data: DataChunk },
    Reload,
    Spectrogram {
        channel: usize,
        start: usize,
        end: usize,
        settings: AnalyzeSettingsSnapshot,
        spectrogram: Vec<Vec<f32>>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrepareData {
    pub sample_rate: f64,
    pub channel_count: usize,
    /// Samples per channel
    pub length: usize,
    pub duration: f64,
}

/// Planar samples for `start..end` of every channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataChunk {
    pub samples: Vec<Vec<f32>>,
    pub length: usize,
    pub channel_count: usize,
    pub start: usize,
    pub end: usize,
    pub whole_length: usize,
    pub auto_analyze: bool,
}

impl From<&SpectrogramRequest> for EngineMessage {
    fn from(request: &SpectrogramRequest) -> Self {
        EngineMessage::Spectrogram {
            channel: request.channel,
            start: request.sample_start,
            end: request.sample_end,
            settings: request.settings.clone(),
        }
    }
}

impl From<SpectrogramTile> for HostMessage {
    fn from(tile: SpectrogramTile) -> Self {
        HostMessage::Spectrogram {
            channel: tile.channel,
            start: tile.sample_start,
            end: tile.sample_end,
            settings: tile.settings,
            spectrogram: tile.magnitude_frames,
        }
    }
}

impl EngineMessage {
    /// A spectrogram request as the provider sees it.
    pub fn into_request(self) -> Option<SpectrogramRequest> {
        match self {
            EngineMessage::Spectrogram {
                channel,
                start,
                end,
                settings,
            } => Some(SpectrogramRequest {
                channel,
                sample_start: start,
                sample_end: end,
                token: settings.token,
                settings,
            }),
            _ => None,
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string(self).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    pub fn from_json(text: &str) -> EngineResult<Self> {
        serde_json::from_str(text).map_err(|e| EngineError::Protocol(e.to_string()))
    }
}

impl HostMessage {
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string(self).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    pub fn from_json(text: &str) -> EngineResult<Self> {
        serde_json::from_str(text).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    /// A spectrogram response as a tile; the token travels inside the
    /// settings.
    pub fn into_tile(self) -> Option<SpectrogramTile> {
        match self {
            HostMessage::Spectrogram {
                channel,
                start,
                end,
                settings,
                spectrogram,
            } => Some(SpectrogramTile {
                channel,
                sample_start: start,
                sample_end: end,
                token: settings.token,
                settings,
                magnitude_frames: spectrogram,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AnalyzeToken, FrequencyScale};

    fn settings() -> AnalyzeSettingsSnapshot {
        AnalyzeSettingsSnapshot {
            sample_rate: 48000.0,
            window_size: 1024,
            hop_size: 256,
            min_frequency: 0.0,
            max_frequency: 24000.0,
            min_time: 0.0,
            max_time: 2.0,
            min_amplitude: -1.0,
            max_amplitude: 1.0,
            spectrogram_db_floor: -90.0,
            frequency_scale: FrequencyScale::Log,
            mel_filter_count: 40,
            token: AnalyzeToken::from_u64(42),
        }
    }

    #[test]
    fn messages_are_type_tagged() {
        let json = EngineMessage::Play { start: 0, end: 100_000 }.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "play");
        assert_eq!(value["end"], 100_000);

        assert_eq!(EngineMessage::Ready.to_json().unwrap(), r#"{"type":"ready"}"#);
    }

    #[test]
    fn missing_prepare_payload_parses_as_none() {
        let msg = HostMessage::from_json(r#"{"type":"prepare","data":null}"#).unwrap();
        assert_eq!(msg, HostMessage::Prepare { data: None });
    }

    #[test]
    fn unknown_message_is_a_protocol_error() {
        let err = HostMessage::from_json(r#"{"type":"bogus"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[test]
    fn spectrogram_messages_carry_requests_and_tiles() {
        let request = SpectrogramRequest {
            channel: 1,
            sample_start: 0,
            sample_end: 10240,
            settings: settings(),
            token: AnalyzeToken::from_u64(42),
        };
        let json = EngineMessage::from(&request).to_json().unwrap();
        assert!(json.contains(r#""frequency_scale":"log""#));
        let parsed = EngineMessage::from_json(&json).unwrap().into_request().unwrap();
        assert_eq!(parsed, request);
        assert!(EngineMessage::Ready.into_request().is_none());

        let response = HostMessage::Spectrogram {
            channel: 1,
            start: 0,
            end: 10240,
            settings: settings(),
            spectrogram: vec![vec![0.5; 4]; 40],
        };
        let tile = HostMessage::from_json(&response.to_json().unwrap())
            .unwrap()
            .into_tile()
            .unwrap();
        assert_eq!(tile.token, AnalyzeToken::from_u64(42));
        assert_eq!(tile.frame_count(), 40);
        assert_eq!(tile.bin_count(), 4);
        assert!(HostMessage::Reload.into_tile().is_none());
    }
}
