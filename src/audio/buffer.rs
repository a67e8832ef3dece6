use crate::error::{EngineError, EngineResult};

/// Decoded, per-channel audio held for the lifetime of one loaded file.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: f64,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data. All channels must share a length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: f64) -> EngineResult<Self> {
        if channels.is_empty() || !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EngineError::EmptyBuffer);
        }
        let len = channels[0].len();
        if len == 0 {
            return Err(EngineError::EmptyBuffer);
        }
        if channels.iter().any(|c| c.len() != len) {
            return Err(EngineError::Protocol(
                "channels have different lengths".to_string(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Buffer of zeros.
    pub fn silent(channel_count: usize, length: usize, sample_rate: f64) -> EngineResult<Self> {
        Self::new(vec![vec![0.0; length]; channel_count], sample_rate)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Observed (min, max) sample value over every channel.
    ///
    /// A buffer without finite samples reports (-1, 1).
    pub fn amplitude_range(&self) -> (f64, f64) {
        let (min, max) = self
            .channels
            .iter()
            .flat_map(|c| c.iter())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min.is_finite() && max.is_finite() {
            (min as f64, max as f64)
        } else {
            (-1.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_shape_and_duration() {
        let buffer = AudioBuffer::silent(2, 44100, 44100.0).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.len(), 44100);
        assert!((buffer.duration() - 1.0).abs() < 1e-12);
        assert!(buffer.channel(2).is_none());
    }

    #[test]
    fn amplitude_range_spans_all_channels() {
        let buffer = AudioBuffer::new(vec![vec![0.1, -0.4], vec![0.7, 0.0]], 8000.0).unwrap();
        let (min, max) = buffer.amplitude_range();
        assert!((min + 0.4).abs() < 1e-6);
        assert!((max - 0.7).abs() < 1e-6);
    }

    #[test]
    fn rejects_ragged_channels() {
        assert!(AudioBuffer::new(vec![vec![0.0; 3], vec![0.0; 2]], 8000.0).is_err());
        assert!(AudioBuffer::new(Vec::new(), 8000.0).is_err());
        assert!(AudioBuffer::silent(2, 0, 8000.0).is_err());
    }
}
