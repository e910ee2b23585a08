// Audio module - extension detection, duration probing, sample decoding

pub mod decode;
pub mod detection;
pub mod probe;

pub use decode::{peak_waveform, Decoder, SymphoniaDecoder, WAVEFORM_BUCKETS};
pub use detection::is_audio_name;
pub use probe::{DurationProbe, LoftyProbe};
