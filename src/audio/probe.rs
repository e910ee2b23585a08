//! Duration probing
//!
//! The enrichment queue needs a cheap way to determine a file's duration
//! without decoding it. Lofty parses container headers only, which keeps a
//! probe well under the queue's per-file timeout for healthy files.

use std::io::Cursor;

use lofty::{AudioFile, Probe};

/// Derives a duration in seconds from raw file bytes.
///
/// Implementations must be cheap enough to run inside a blocking task; the
/// caller enforces a hard timeout around each probe.
pub trait DurationProbe: Send + Sync {
    fn probe(&self, bytes: &[u8], name: &str) -> Result<f64, String>;
}

/// Header-level probe backed by lofty.
pub struct LoftyProbe;

impl DurationProbe for LoftyProbe {
    fn probe(&self, bytes: &[u8], name: &str) -> Result<f64, String> {
        let tagged = Probe::new(Cursor::new(bytes))
            .guess_file_type()
            .map_err(|e| format!("Failed to identify {}: {}", name, e))?
            .read()
            .map_err(|e| format!("Failed to parse {}: {}", name, e))?;

        Ok(tagged.properties().duration().as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::wav_bytes;

    #[test]
    fn test_probe_wav_duration() {
        // 2 seconds of 8kHz mono silence
        let bytes = wav_bytes(2.0, 8_000);
        let duration = LoftyProbe.probe(&bytes, "silence.wav").unwrap();
        assert!((duration - 2.0).abs() < 0.1, "got {}", duration);
    }

    #[test]
    fn test_probe_garbage_fails() {
        let result = LoftyProbe.probe(b"not audio at all", "garbage.wav");
        assert!(result.is_err());
    }

    #[test]
    fn test_probe_empty_fails() {
        assert!(LoftyProbe.probe(b"", "empty.wav").is_err());
    }
}
