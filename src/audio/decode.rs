//! Full sample decoding (Symphonia) and peak waveform construction.

use std::io::Cursor;

use symphonia::core::audio::{AudioBufferRef, SampleBuffer, Signal, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Number of peak buckets in a rendered waveform.
pub const WAVEFORM_BUCKETS: usize = 800;

/// Result of decoding a file to samples.
pub struct Decoded {
    /// First-channel samples.
    pub channel0: Vec<f32>,
    /// Total duration in seconds.
    pub duration: f64,
}

/// Opaque "decode to samples" capability.
///
/// May fail; the sequencer treats a failure as a load failure.
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8], name: &str) -> Result<Decoded, String>;
}

/// Symphonia-backed decoder.
pub struct SymphoniaDecoder;

impl Decoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], name: &str) -> Result<Decoded, String> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut hint = Hint::new();
        if let Some((_, ext)) = name.rsplit_once('.') {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| format!("Format probe failed for {}: {}", name, e))?;

        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| format!("No supported audio track in {}", name))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| format!("Decoder init failed for {}: {}", name, e))?;

        let mut channel0: Vec<f32> = Vec::new();
        let mut sample_rate = codec_params.sample_rate.unwrap_or(44100);

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                // End of stream surfaces as an I/O error in symphonia 0.5
                Err(SymphoniaError::IoError(_)) => break,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(format!("Read error in {}: {}", name, e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                // Corrupt packet; skip
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(SymphoniaError::IoError(_)) => break,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(format!("Decode error in {}: {}", name, e)),
            };

            match decoded {
                AudioBufferRef::F32(buf) => {
                    sample_rate = buf.spec().rate;
                    channel0.extend_from_slice(buf.chan(0));
                }
                other => {
                    let spec = SignalSpec::new(other.spec().rate, other.spec().channels.clone());
                    sample_rate = spec.rate;
                    let channels = spec.channels.count();
                    let frames = other.frames();

                    let mut sbuf = SampleBuffer::<f32>::new(frames as u64, spec);
                    sbuf.copy_interleaved_ref(other);
                    channel0.extend(sbuf.samples().iter().step_by(channels));
                }
            }
        }

        if channel0.is_empty() {
            return Err(format!("No samples decoded from {}", name));
        }

        let duration = channel0.len() as f64 / sample_rate as f64;
        Ok(Decoded { channel0, duration })
    }
}

/// Reduce samples to a coarse peak waveform.
///
/// Produces exactly `buckets` values, each the maximum absolute amplitude of
/// its block of samples. Blocks past the end of the input yield 0.
pub fn peak_waveform(samples: &[f32], buckets: usize) -> Vec<f32> {
    if buckets == 0 {
        return Vec::new();
    }
    if samples.is_empty() {
        return vec![0.0; buckets];
    }

    let block = samples.len().div_ceil(buckets).max(1);
    let mut peaks = Vec::with_capacity(buckets);
    for i in 0..buckets {
        let start = i * block;
        let end = ((i + 1) * block).min(samples.len());
        let peak = if start < samples.len() {
            samples[start..end]
                .iter()
                .fold(0.0f32, |acc, s| acc.max(s.abs()))
        } else {
            0.0
        };
        peaks.push(peak);
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::wav_bytes_with_tone;

    #[test]
    fn test_peak_waveform_bucket_count() {
        let samples: Vec<f32> = (0..10_000).map(|i| (i as f32 / 10_000.0).sin()).collect();
        let peaks = peak_waveform(&samples, WAVEFORM_BUCKETS);
        assert_eq!(peaks.len(), WAVEFORM_BUCKETS);
    }

    #[test]
    fn test_peak_waveform_uses_max_abs() {
        let samples = vec![0.1, -0.9, 0.2, 0.3, 0.5, -0.4, 0.0, 0.0];
        let peaks = peak_waveform(&samples, 2);
        assert_eq!(peaks, vec![0.9, 0.5]);
    }

    #[test]
    fn test_peak_waveform_short_input_pads_with_zero() {
        let samples = vec![0.5, 0.25];
        let peaks = peak_waveform(&samples, 4);
        assert_eq!(peaks.len(), 4);
        assert_eq!(peaks[0], 0.5);
        assert_eq!(peaks[1], 0.25);
        assert_eq!(peaks[2], 0.0);
        assert_eq!(peaks[3], 0.0);
    }

    #[test]
    fn test_peak_waveform_empty_input() {
        let peaks = peak_waveform(&[], 8);
        assert_eq!(peaks, vec![0.0; 8]);
    }

    #[test]
    fn test_decode_wav_tone() {
        let bytes = wav_bytes_with_tone(1.0, 8_000, 0.5);
        let decoded = SymphoniaDecoder.decode(&bytes, "tone.wav").unwrap();
        assert!((decoded.duration - 1.0).abs() < 0.05, "got {}", decoded.duration);
        assert_eq!(decoded.channel0.len(), 8_000);

        let peak = decoded.channel0.iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.05, "got {}", peak);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(SymphoniaDecoder.decode(b"definitely not audio", "x.wav").is_err());
    }
}
