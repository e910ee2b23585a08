/// Check if a name refers to an audio file based on its extension
pub fn is_audio_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_lowercase();
            matches!(
                ext.as_str(),
                "wav" | "mp3" | "aif" | "aiff" | "flac" | "ogg" | "m4a" | "aac"
            )
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizes_audio_formats() {
        assert!(is_audio_name("test.mp3"));
        assert!(is_audio_name("test.FLAC"));
        assert!(is_audio_name("test.wav"));
        assert!(is_audio_name("test.aif"));
        assert!(is_audio_name("test.aiff"));
        assert!(is_audio_name("test.m4a"));
    }

    #[test]
    fn test_rejects_non_audio() {
        assert!(!is_audio_name("test.txt"));
        assert!(!is_audio_name("test"));
        assert!(!is_audio_name("test.opus"));
        assert!(!is_audio_name(".wav"));
    }
}
