use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::buffer::AudioBuffer;
use crate::error::EngineError;

/// Header facts the host reports before any samples are transferred.
#[derive(Clone, Debug)]
pub struct FormatInfo {
    pub format_tag: String,
    pub chunk_size: usize,
}

/// Decode a file into planar per-channel samples.
///
/// Anything symphonia cannot probe or decode surfaces as
/// [`EngineError::UnsupportedFormat`].
pub fn decode_file(path: &Path) -> Result<(AudioBuffer, FormatInfo)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let chunk_size = file.metadata().map(|m| m.len() as usize).unwrap_or(0);

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| EngineError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::UnsupportedFormat("no audio tracks found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| EngineError::UnsupportedFormat("unknown sample rate".into()))?;
    let format_tag = symphonia::default::get_codecs()
        .get_codec(track.codec_params.codec)
        .map(|d| d.short_name.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::UnsupportedFormat(e.to_string()))?;

    // Some containers leave the layout to the codec; the first decoded
    // packet decides
    let mut channels: Vec<Vec<f32>> = track
        .codec_params
        .channels
        .map_or_else(Vec::new, |c| vec![Vec::new(); c.count()]);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        if !deinterleave(&mut channels, sample_buf.samples(), spec.channels.count()) {
            log::warn!("Skipping packet with {} channels", spec.channels.count());
        }
    }

    let buffer = AudioBuffer::new(channels, sample_rate as f64)?;

    log::info!(
        "Decoded audio: {} channels x {} samples, {}Hz, {:.1}s",
        buffer.channel_count(),
        buffer.len(),
        sample_rate,
        buffer.duration()
    );

    Ok((
        buffer,
        FormatInfo {
            format_tag,
            chunk_size,
        },
    ))
}

/// Append interleaved frames of `count` channels to planar storage.
/// Empty storage takes the packet's layout; a packet with a different
/// layout is rejected.
fn deinterleave(channels: &mut Vec<Vec<f32>>, interleaved: &[f32], count: usize) -> bool {
    if count == 0 {
        return false;
    }
    if channels.is_empty() {
        *channels = vec![Vec::new(); count];
    }
    if channels.len() != count {
        return false;
    }
    for frame in interleaved.chunks(count) {
        for (ch, &s) in frame.iter().enumerate() {
            channels[ch].push(s);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_packet_sets_channel_layout() {
        let mut channels = Vec::new();
        assert!(deinterleave(&mut channels, &[0.1, -0.1, 0.2, -0.2], 2));
        assert_eq!(channels, vec![vec![0.1, 0.2], vec![-0.1, -0.2]]);

        assert!(deinterleave(&mut channels, &[0.3, -0.3], 2));
        assert_eq!(channels[1], vec![-0.1, -0.2, -0.3]);

        assert!(!deinterleave(&mut channels, &[0.5, 0.5, 0.5], 3));
        assert_eq!(channels[0].len(), 3);
    }

    #[test]
    fn decodes_stereo_wav() {
        let frames: [[i16; 2]; 4] = [[0, 16384], [8192, -16384], [-8192, 0], [0, 0]];
        let data_len = (frames.len() * 4) as u32;
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&(8000u32 * 4).to_le_bytes());
        wav.extend_from_slice(&4u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        for frame in frames {
            for s in frame {
                wav.extend_from_slice(&s.to_le_bytes());
            }
        }
        let path = std::env::temp_dir().join(format!("wavpeek-stereo-{}.wav", std::process::id()));
        std::fs::write(&path, &wav).unwrap();

        let (buffer, info) = decode_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.sample_rate(), 8000.0);
        assert_eq!(info.chunk_size, wav.len());
        assert!((buffer.channel(1).unwrap()[0] - 0.5).abs() < 1e-6);
        assert!((buffer.channel(1).unwrap()[1] + 0.5).abs() < 1e-6);
    }
}
